mod cli;

use anyhow::{anyhow, Context};
use clap::Parser;
use serde::Serialize;

use nft_market_lab::{
    api::{self, AppState},
    config::Config,
    dashboard::{dashboard_stats, Dashboard, DashboardState, FetchMode},
    filter::filter_collections,
    http::HttpClient,
    marketplace::MarketplaceClient,
    models::Network,
    wallet::WalletAggregator,
};

use crate::cli::{Cli, Commands, FilterArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    match cli.command {
        Commands::Serve { addr } => {
            let bind = addr.unwrap_or_else(|| config.http_bind_addr.clone());
            let http = HttpClient::new(config.http_timeout).context("failed to build http client")?;
            let state = AppState {
                marketplace: MarketplaceClient::from_config(http, &config),
            };
            api::run_http_server(&bind, state).await?;
        }
        Commands::Browse { page, filters } => {
            let dashboard = dashboard(&config)?;
            walk_to_page(&dashboard, page).await;
            print_listing(&dashboard.snapshot(), &filters, &config.ecosystem_keywords)?;
        }
        Commands::Trending { page, filters } => {
            let dashboard = dashboard(&config)?;
            dashboard.switch_mode(FetchMode::Trending).await;
            if page > 1 {
                dashboard.change_page(page).await;
            }
            print_listing(&dashboard.snapshot(), &filters, &config.ecosystem_keywords)?;
        }
        Commands::Search { query, page, filters } => {
            let dashboard = dashboard(&config)?;
            dashboard.search(&query).await;
            if page > 1 {
                dashboard.change_page(page).await;
            }
            print_listing(&dashboard.snapshot(), &filters, &config.ecosystem_keywords)?;
        }
        Commands::Portfolio { address } => {
            let dashboard = dashboard(&config)?;
            dashboard.switch_mode(FetchMode::Portfolio).await;
            dashboard.set_address(&address).await;
            let state = dashboard.snapshot();
            print_json(&serde_json::json!({
                "status": state.status,
                "portfolio": state.portfolio,
                "wallet": state.wallet,
            }))?;
        }
        Commands::Wallet { address } => {
            let http = HttpClient::new(config.http_timeout).context("failed to build http client")?;
            let report = WalletAggregator::from_config(http, &config)
                .aggregate(&address)
                .await
                .context("wallet aggregation failed")?;
            print_json(&report)?;
        }
        Commands::Market { network } => {
            let network: Network = network.parse().map_err(|e: String| anyhow!(e))?;
            let dashboard = dashboard(&config)?;
            dashboard.set_network(network).await;
            let state = dashboard.snapshot();
            print_json(&serde_json::json!({
                "price": state.price,
                "networkStats": state.network_stats,
            }))?;
        }
    }

    Ok(())
}

fn dashboard(config: &Config) -> anyhow::Result<Dashboard> {
    Dashboard::from_config(config).context("failed to build dashboard")
}

/// Cursor pagination only moves forward one page at a time.
async fn walk_to_page(dashboard: &Dashboard, page: u32) {
    dashboard.change_page(1).await;
    for next in 2..=page {
        if !dashboard.snapshot().fetch.has_next_page {
            tracing::info!(last = next - 1, "no further pages");
            break;
        }
        dashboard.change_page(next).await;
    }
}

/// Stats cover the fetched page; filters only narrow what is printed.
fn print_listing(state: &DashboardState, args: &FilterArgs, keywords: &[String]) -> anyhow::Result<()> {
    let mut shown = args.collection_filters().apply(&state.collections);
    if args.ecosystem {
        shown = filter_collections(&shown, keywords, None);
    }
    print_json(&serde_json::json!({
        "status": state.status,
        "fetch": state.fetch,
        "stats": dashboard_stats(&state.collections),
        "collections": shown,
    }))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
