use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use nft_market_lab::filter::{CollectionFilters, SizeBucket};

#[derive(Parser, Debug)]
#[command(name = "nft-market-lab", version, about = "NFT collection market data and wallet stats")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print one page of collections ranked by all-time volume
    Browse {
        /// Page to load; earlier pages are walked to collect cursors
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print trending collections
    Trending {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Search collections by name
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print ecosystem holdings and wallet stats for an address
    Portfolio { address: String },
    /// Print wallet stats only
    Wallet { address: String },
    /// Print the reference price and network stats
    Market {
        /// mainnet or testnet
        #[arg(long, default_value = "mainnet")]
        network: String,
    },
    /// Run the HTTP proxy server
    Serve {
        /// Override bind address, e.g. 0.0.0.0:8080
        #[arg(long)]
        addr: Option<String>,
    },
}

/// Client-side narrowing of a fetched page.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Keep only collections matching the ecosystem keywords
    #[arg(long)]
    pub ecosystem: bool,
    #[arg(long)]
    pub min_price: Option<Decimal>,
    #[arg(long)]
    pub max_price: Option<Decimal>,
    /// Minimum 24h volume
    #[arg(long)]
    pub min_volume: Option<Decimal>,
    /// small (<1000), medium (1000-10000) or large (>10000)
    #[arg(long, default_value = "any")]
    pub size: SizeBucket,
    #[arg(long)]
    pub verified_only: bool,
}

impl FilterArgs {
    pub fn collection_filters(&self) -> CollectionFilters {
        CollectionFilters {
            min_price: self.min_price,
            max_price: self.max_price,
            min_volume_24h: self.min_volume,
            size: self.size,
            verified_only: self.verified_only,
        }
    }
}
