pub mod api;
pub mod config;
pub mod dashboard;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod http;
pub mod market;
pub mod marketplace;
pub mod models;
pub mod wallet;
