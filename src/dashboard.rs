//! Fetch orchestration behind the dashboard view.
//!
//! [`Dashboard`] owns one [`DashboardState`] and is the only writer. Each
//! operation stamps a request with a per-slot sequence number; when the
//! response lands, it is applied only if no newer request for the same
//! slot was issued in the meantime. The state lock is never held across an
//! await.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    config::Config,
    debounce::SearchDebouncer,
    error::{AggregateError, FetchError},
    http::HttpClient,
    market::{network_stats, PriceClient},
    marketplace::{or_empty, MarketplaceClient},
    models::{
        Collection, CollectionPage, DashboardStats, Network, NetworkStats, PortfolioItem,
        WalletReport,
    },
    wallet::WalletAggregator,
};

/// Estimated pages beyond the current one when a continuation exists.
const BROWSE_LOOKAHEAD: u32 = 50;
const SEARCH_LOOKAHEAD: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Browse,
    Search,
    Trending,
    Portfolio,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Error,
}

/// What the presentation layer should show for the active mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewStatus {
    #[default]
    NotLoaded,
    Loaded,
    /// Well-formed response without items.
    Empty {
        message: String,
        query: Option<String>,
    },
    /// The fetch itself failed; a retry may help.
    Error { message: String },
    /// An address was submitted but nothing was found for it.
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Slot {
    Listing,
    Trending,
    Portfolio,
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    slot: Slot,
    seq: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchState {
    pub mode: FetchMode,
    pub phase: Phase,
    pub page: u32,
    pub continuation: Option<String>,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub loading: bool,
    pub error: Option<String>,
    /// Lower bound; upstream never reports a page count.
    pub total_pages: u32,
    pub request_seq: u64,
    /// Cursor that produced each browse page seen since the last reset.
    #[serde(skip)]
    cursors: BTreeMap<u32, Option<String>>,
}

impl FetchState {
    fn reset(&mut self, mode: FetchMode) {
        *self = Self {
            mode,
            page: 1,
            total_pages: 1,
            request_seq: self.request_seq,
            ..Self::default()
        };
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.loading = phase == Phase::Loading;
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub collections: Vec<Collection>,
    pub trending: Vec<Collection>,
    pub portfolio: Vec<PortfolioItem>,
    pub wallet: Option<WalletReport>,
    pub price: Option<Decimal>,
    pub network_stats: Option<NetworkStats>,
    pub network: Network,
    pub address: Option<String>,
    pub search_query: String,
    pub last_updated: Option<DateTime<Utc>>,
    pub status: ViewStatus,
    pub fetch: FetchState,
    #[serde(skip)]
    latest: BTreeMap<Slot, u64>,
}

/// One listing call, fully resolved from the state at issue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListingRequest {
    mode: FetchMode,
    page: u32,
    cursor: Option<String>,
    query: Option<String>,
}

impl DashboardState {
    pub fn new() -> Self {
        let mut state = Self::default();
        state.fetch.reset(FetchMode::Browse);
        state
    }

    fn begin(&mut self, slot: Slot) -> Ticket {
        self.fetch.request_seq += 1;
        let seq = self.fetch.request_seq;
        self.latest.insert(slot, seq);
        Ticket { slot, seq }
    }

    pub(crate) fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.get(&ticket.slot) == Some(&ticket.seq)
    }

    /// Resets pagination for `mode`. Cursors never carry across modes.
    pub(crate) fn enter_mode(&mut self, mode: FetchMode) {
        self.fetch.reset(mode);
        if mode != FetchMode::Search {
            self.search_query.clear();
        }
    }

    /// Resolves a page number into a listing request for the active mode.
    ///
    /// Browse pages are cursor addressed: page 1 needs no cursor, later
    /// pages use the cursor recorded when the previous page was loaded. A
    /// forward jump with a held continuation lands on the next page. Pages
    /// with no known cursor restart from page 1.
    pub(crate) fn plan_page(&self, page: u32) -> ListingRequest {
        let page = page.max(1);
        let mode = self.fetch.mode;
        let query = (mode == FetchMode::Search).then(|| self.search_query.clone());

        if mode != FetchMode::Browse || page == 1 {
            return ListingRequest {
                mode,
                page,
                cursor: None,
                query,
            };
        }

        if let Some(cursor) = self.fetch.cursors.get(&page) {
            return ListingRequest {
                mode,
                page,
                cursor: cursor.clone(),
                query,
            };
        }

        if page > self.fetch.page {
            if let Some(cursor) = &self.fetch.continuation {
                return ListingRequest {
                    mode,
                    page: self.fetch.page.saturating_add(1),
                    cursor: Some(cursor.clone()),
                    query,
                };
            }
        }

        tracing::info!(page, "no cursor known for page, restarting from page 1");
        ListingRequest {
            mode,
            page: 1,
            cursor: None,
            query,
        }
    }

    pub(crate) fn begin_listing(&mut self) -> Ticket {
        self.fetch.error = None;
        self.fetch.set_phase(Phase::Loading);
        self.begin(Slot::Listing)
    }

    pub(crate) fn apply_listing(
        &mut self,
        ticket: Ticket,
        request: &ListingRequest,
        result: Result<CollectionPage, FetchError>,
    ) -> bool {
        if !self.is_current(ticket) || self.fetch.mode != request.mode {
            tracing::debug!(seq = ticket.seq, "discarding superseded listing response");
            return false;
        }

        match result {
            Ok(page) => {
                let fetch = &mut self.fetch;
                fetch.page = request.page;
                fetch.has_prev_page = request.page > 1;
                fetch.has_next_page = page.has_next();
                fetch.total_pages = estimate_total_pages(request.mode, request.page, page.has_next());
                if request.mode == FetchMode::Browse {
                    fetch.cursors.insert(request.page, request.cursor.clone());
                    if let Some(next) = &page.continuation {
                        fetch.cursors.insert(request.page.saturating_add(1), Some(next.clone()));
                    }
                }
                fetch.continuation = page.continuation;
                fetch.set_phase(Phase::Idle);

                self.status = if page.collections.is_empty() {
                    empty_status(request)
                } else {
                    ViewStatus::Loaded
                };
                self.collections = page.collections;
                self.last_updated = Some(Utc::now());
            }
            Err(err) => {
                let message = failure_message(request.mode).to_string();
                tracing::warn!(mode = ?request.mode, page = request.page, error = %err, "listing fetch failed");
                self.collections.clear();
                self.fetch.has_next_page = false;
                self.fetch.set_phase(Phase::Error);
                self.fetch.error = Some(message.clone());
                self.status = ViewStatus::Error { message };
            }
        }
        true
    }

    pub(crate) fn begin_portfolio(&mut self) -> Option<(Ticket, String)> {
        let address = self.address.clone()?;
        if self.fetch.mode == FetchMode::Portfolio {
            self.fetch.error = None;
            self.fetch.set_phase(Phase::Loading);
        }
        Some((self.begin(Slot::Portfolio), address))
    }

    pub(crate) fn apply_portfolio(
        &mut self,
        ticket: Ticket,
        holdings: Result<Vec<PortfolioItem>, FetchError>,
        wallet: Result<WalletReport, AggregateError>,
    ) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(seq = ticket.seq, "discarding superseded portfolio response");
            return false;
        }

        let holdings_failed = match holdings {
            Ok(items) => {
                self.portfolio = items;
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "portfolio holdings fetch failed");
                self.portfolio.clear();
                true
            }
        };
        self.wallet = match wallet {
            Ok(report) => Some(report),
            Err(err) => {
                tracing::warn!(error = %err, "wallet aggregation failed");
                None
            }
        };

        if self.fetch.mode == FetchMode::Portfolio {
            if holdings_failed {
                let message = failure_message(FetchMode::Portfolio).to_string();
                self.fetch.set_phase(Phase::Error);
                self.fetch.error = Some(message.clone());
                self.status = ViewStatus::Error { message };
            } else {
                self.fetch.set_phase(Phase::Idle);
                self.status = if self.portfolio.is_empty() && !wallet_has_activity(self.wallet.as_ref()) {
                    ViewStatus::NoData
                } else {
                    ViewStatus::Loaded
                };
            }
        }
        self.last_updated = Some(Utc::now());
        true
    }
}

fn wallet_has_activity(report: Option<&WalletReport>) -> bool {
    report.is_some_and(|r| r.stats.total_transactions > 0 || r.nft_count > 0)
}

fn estimate_total_pages(mode: FetchMode, page: u32, has_next: bool) -> u32 {
    if !has_next {
        return page;
    }
    match mode {
        FetchMode::Browse => page.saturating_add(BROWSE_LOOKAHEAD),
        _ => page.saturating_add(SEARCH_LOOKAHEAD),
    }
}

fn empty_status(request: &ListingRequest) -> ViewStatus {
    match &request.query {
        Some(q) if request.mode == FetchMode::Search => ViewStatus::Empty {
            message: format!("No collections found for \"{q}\""),
            query: Some(q.clone()),
        },
        _ => ViewStatus::Empty {
            message: "No collections found".to_string(),
            query: None,
        },
    }
}

fn failure_message(mode: FetchMode) -> &'static str {
    match mode {
        FetchMode::Browse => "Failed to fetch NFT data",
        FetchMode::Search => "Search failed",
        FetchMode::Trending => "Failed to fetch trending collections",
        FetchMode::Portfolio => "Failed to fetch portfolio",
    }
}

/// Page numbers a pager shows: a window of `max_visible` around `current`,
/// clamped to `1..=total`.
pub fn visible_pages(current: u32, total: u32, max_visible: u32) -> Vec<u32> {
    if total == 0 || max_visible == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total);
    let mut start = current.saturating_sub(max_visible / 2).max(1);
    let end = start.saturating_add(max_visible - 1).min(total);
    if end - start + 1 < max_visible {
        start = end.saturating_sub(max_visible - 1).max(1);
    }
    (start..=end).collect()
}

/// Sum of total values, saturating at [`Decimal::MAX`].
pub fn portfolio_total_value(items: &[PortfolioItem]) -> Decimal {
    items.iter().fold(Decimal::ZERO, |acc, item| {
        acc.checked_add(item.total_value).unwrap_or(Decimal::MAX)
    })
}

pub fn dashboard_stats(collections: &[Collection]) -> DashboardStats {
    let saturating_sum = |acc: Decimal, v: Decimal| acc.checked_add(v).unwrap_or(Decimal::MAX);

    let (floor_sum, priced) = collections
        .iter()
        .filter(|c| c.floor_price > Decimal::ZERO)
        .fold((Decimal::ZERO, 0u64), |(sum, n), c| {
            (saturating_sum(sum, c.floor_price), n + 1)
        });
    let avg_floor_price = if priced == 0 {
        Decimal::ZERO
    } else {
        floor_sum
            .checked_div(Decimal::from(priced))
            .unwrap_or_default()
    };

    DashboardStats {
        total_collections: collections.len() as u64,
        total_volume_24h: collections
            .iter()
            .map(|c| c.volume_24h)
            .fold(Decimal::ZERO, saturating_sum),
        avg_floor_price,
        total_owners: collections
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(c.owners)),
    }
}

#[derive(Clone)]
pub struct Dashboard {
    marketplace: MarketplaceClient,
    wallet: WalletAggregator,
    prices: PriceClient,
    page_size: u32,
    trending_period: String,
    state: Arc<RwLock<DashboardState>>,
}

impl Dashboard {
    pub fn new(
        marketplace: MarketplaceClient,
        wallet: WalletAggregator,
        prices: PriceClient,
        page_size: u32,
        trending_period: impl Into<String>,
    ) -> Self {
        Self {
            marketplace,
            wallet,
            prices,
            page_size: page_size.max(1),
            trending_period: trending_period.into(),
            state: Arc::new(RwLock::new(DashboardState::new())),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let http = HttpClient::new(config.http_timeout)?;
        Ok(Self::new(
            MarketplaceClient::from_config(http.clone(), config),
            WalletAggregator::from_config(http.clone(), config),
            PriceClient::from_config(http, config),
            config.page_size,
            config.trending_period.clone(),
        ))
    }

    pub fn snapshot(&self) -> DashboardState {
        self.state.read().clone()
    }

    /// Initial load: first browse page, trending list and market context.
    pub async fn start(&self) {
        tokio::join!(
            self.change_page(1),
            self.fetch_trending(),
            self.load_market_context()
        );
    }

    /// Re-fetches the active mode at its current page.
    pub async fn fetch(&self) {
        let page = self.state.read().fetch.page;
        self.change_page(page).await;
    }

    pub async fn change_page(&self, page: u32) {
        let mode = self.state.read().fetch.mode;
        if mode == FetchMode::Portfolio {
            self.load_portfolio().await;
            return;
        }
        let request = self.state.read().plan_page(page);
        self.load_listing(request).await;
    }

    pub async fn switch_mode(&self, mode: FetchMode) {
        let no_query = {
            let mut state = self.state.write();
            let no_query = mode == FetchMode::Search && state.search_query.trim().is_empty();
            if !no_query {
                state.enter_mode(mode);
                state.status = ViewStatus::NotLoaded;
            }
            no_query
        };
        if no_query {
            return self.clear_search().await;
        }
        tracing::info!(?mode, "switched mode");
        self.change_page(1).await;
    }

    /// Blank queries clear the search and go back to browsing.
    pub async fn search(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return self.clear_search().await;
        }
        {
            let mut state = self.state.write();
            state.enter_mode(FetchMode::Search);
            state.search_query = query.to_string();
        }
        self.change_page(1).await;
    }

    pub async fn clear_search(&self) {
        self.state.write().enter_mode(FetchMode::Browse);
        self.change_page(1).await;
    }

    /// Schedules a search for a keystroke. A blank input while searching
    /// schedules a return to browsing instead.
    pub fn on_search_input(&self, debouncer: &mut SearchDebouncer, input: &str) {
        let query = input.trim().to_string();
        let searching = self.state.read().fetch.mode == FetchMode::Search;
        if query.is_empty() && !searching {
            debouncer.cancel();
            return;
        }
        let dashboard = self.clone();
        debouncer.schedule(move || async move {
            dashboard.search(&query).await;
        });
    }

    /// Re-issues the active mode at its page plus the auxiliary lists.
    pub async fn refresh(&self) {
        tokio::join!(
            self.fetch(),
            self.fetch_trending(),
            self.load_market_context(),
            self.refresh_portfolio_if_set()
        );
    }

    pub async fn set_address(&self, address: &str) {
        let address = address.trim();
        {
            let mut state = self.state.write();
            state.portfolio.clear();
            state.wallet = None;
            if address.is_empty() {
                state.address = None;
                // Invalidate anything still in flight for the old address.
                let _ = state.begin(Slot::Portfolio);
                if state.fetch.mode == FetchMode::Portfolio {
                    state.fetch.error = None;
                    state.fetch.set_phase(Phase::Idle);
                    state.status = ViewStatus::NotLoaded;
                }
                return;
            }
            state.address = Some(address.to_string());
        }
        self.load_portfolio().await;
    }

    pub async fn set_network(&self, network: Network) {
        self.state.write().network = network;
        self.load_market_context().await;
    }

    /// Auxiliary trending list; failures leave it empty and are only logged.
    pub async fn fetch_trending(&self) {
        let ticket = self.state.write().begin(Slot::Trending);
        let page = or_empty(
            self.marketplace
                .trending(&self.trending_period, self.page_size, 0)
                .await,
            "trending",
        );
        let mut state = self.state.write();
        if state.is_current(ticket) {
            state.trending = page.collections;
        }
    }

    pub async fn load_market_context(&self) {
        let (ticket, network) = {
            let mut state = self.state.write();
            (state.begin(Slot::Market), state.network)
        };
        let price = self.prices.reference_price().await;
        let stats = network_stats(network, &mut rand::thread_rng());

        let mut state = self.state.write();
        if state.is_current(ticket) {
            state.price = Some(price);
            state.network_stats = Some(stats);
        }
    }

    async fn refresh_portfolio_if_set(&self) {
        let (has_address, mode) = {
            let state = self.state.read();
            (state.address.is_some(), state.fetch.mode)
        };
        // In portfolio mode the main fetch already reloads it.
        if has_address && mode != FetchMode::Portfolio {
            self.load_portfolio().await;
        }
    }

    async fn load_listing(&self, request: ListingRequest) {
        let ticket = self.state.write().begin_listing();
        tracing::debug!(?request, seq = ticket.seq, "issuing listing request");

        let offset = (request.page - 1).saturating_mul(self.page_size);
        let result = match request.mode {
            FetchMode::Browse => {
                self.marketplace
                    .browse(self.page_size, request.cursor.as_deref())
                    .await
            }
            FetchMode::Search => {
                let query = request.query.as_deref().unwrap_or_default();
                self.marketplace.search(query, self.page_size, offset).await
            }
            FetchMode::Trending => {
                self.marketplace
                    .trending(&self.trending_period, self.page_size, offset)
                    .await
            }
            FetchMode::Portfolio => return,
        };

        self.state.write().apply_listing(ticket, &request, result);
    }

    async fn load_portfolio(&self) {
        let begun = self.state.write().begin_portfolio();
        let Some((ticket, address)) = begun else {
            tracing::debug!("no address set, skipping portfolio fetch");
            return;
        };

        let (holdings, wallet) = tokio::join!(
            self.marketplace.user_collections(&address, 0, self.page_size),
            self.wallet.aggregate(&address)
        );

        self.state.write().apply_portfolio(ticket, holdings, wallet);
    }
}
