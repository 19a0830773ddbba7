use serde_json::Value;
use url::Url;

use crate::{
    config::Config,
    error::FetchError,
    filter::{KeywordMatcher, ECOSYSTEM_KEYWORDS},
    formatter::{format_collection, format_portfolio_item},
    http::{endpoint_label, extend_path, HttpClient},
    models::{CollectionPage, PortfolioItem},
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Client for the marketplace listing endpoints.
///
/// Every call returns a tagged result: an empty page is a legitimate
/// answer, a transport failure is an `Err`. Callers that want the old
/// "failure looks empty" behavior go through [`or_empty`].
#[derive(Clone)]
pub struct MarketplaceClient {
    http: HttpClient,
    base_url: Url,
    api_key: Option<String>,
    keywords: Vec<String>,
}

impl MarketplaceClient {
    pub fn new(http: HttpClient, base_url: Url, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url,
            api_key,
            keywords: ECOSYSTEM_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }

    pub fn from_config(http: HttpClient, config: &Config) -> Self {
        Self::new(
            http,
            config.marketplace_url.clone(),
            config.marketplace_api_key.clone(),
        )
        .with_keywords(config.ecosystem_keywords.clone())
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// All collections by all-time volume, continuation-cursor paginated.
    pub async fn browse(
        &self,
        limit: u32,
        continuation: Option<&str>,
    ) -> Result<CollectionPage, FetchError> {
        let mut url = extend_path(&self.base_url, &["collections", "v7"])?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("includeMintStages", "false")
                .append_pair("includeSecurityConfigs", "false")
                .append_pair("normalizeRoyalties", "false")
                .append_pair("useNonFlaggedFloorAsk", "false")
                .append_pair("sortBy", "allTimeVolume")
                .append_pair("limit", &limit.to_string());
            if let Some(token) = continuation {
                q.append_pair("continuation", token);
            }
        }

        let page = self.fetch_page(url).await?;
        tracing::info!(
            count = page.collections.len(),
            has_next = page.has_next(),
            "browse returned collections"
        );
        Ok(page)
    }

    /// Collections ranked by sales over `period` (e.g. "1d", "7d").
    pub async fn trending(
        &self,
        period: &str,
        limit: u32,
        offset: u32,
    ) -> Result<CollectionPage, FetchError> {
        let mut url = extend_path(&self.base_url, &["collections", "trending", "v1"])?;
        url.query_pairs_mut()
            .append_pair("period", period)
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair("sortBy", "sales")
            .append_pair("normalizeRoyalties", "false")
            .append_pair("useNonFlaggedFloorAsk", "false");

        self.fetch_page(url).await
    }

    /// Server-side name search, offset paginated.
    pub async fn search(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> Result<CollectionPage, FetchError> {
        let mut url = extend_path(&self.base_url, &["search", "collections", "v2"])?;
        url.query_pairs_mut()
            .append_pair("name", query)
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());

        let page = self.fetch_page(url).await?;
        tracing::info!(query, count = page.collections.len(), "search returned collections");
        Ok(page)
    }

    /// Holdings of `address`, narrowed to ecosystem collections.
    pub async fn user_collections(
        &self,
        address: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<PortfolioItem>, FetchError> {
        let mut url = extend_path(&self.base_url, &["users", address, "collections", "v3"])?;
        url.query_pairs_mut()
            .append_pair("includeTopBid", "false")
            .append_pair("includeLiquidCount", "false")
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());

        let body = self.get_json(url).await?;
        let items: Vec<PortfolioItem> = body
            .get("collections")
            .and_then(Value::as_array)
            .map(|raw| raw.iter().map(format_portfolio_item).collect())
            .unwrap_or_default();

        let total = items.len();
        let matcher = KeywordMatcher::new(&self.keywords, None);
        let items: Vec<PortfolioItem> = items
            .into_iter()
            .filter(|item| matcher.matches(&item.collection))
            .collect();

        tracing::info!(total, ecosystem = items.len(), "portfolio holdings fetched");
        Ok(items)
    }

    /// Raw listing call used by the proxy. The query string is forwarded
    /// untouched.
    pub async fn raw_listing(&self, raw_query: Option<&str>) -> Result<Value, FetchError> {
        let mut url = extend_path(&self.base_url, &["collections", "v7"])?;
        url.set_query(raw_query.filter(|q| !q.is_empty()));
        self.get_json(url).await
    }

    async fn fetch_page(&self, url: Url) -> Result<CollectionPage, FetchError> {
        let body = self.get_json(url).await?;
        let collections = body
            .get("collections")
            .and_then(Value::as_array)
            .map(|raw| raw.iter().map(format_collection).collect())
            .unwrap_or_default();
        let continuation = body
            .get("continuation")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(CollectionPage {
            collections,
            continuation,
        })
    }

    async fn get_json(&self, url: Url) -> Result<Value, FetchError> {
        let endpoint = endpoint_label(&url);
        let Some(key) = self.api_key.as_deref() else {
            tracing::warn!(%endpoint, "marketplace api key not configured");
            return Err(FetchError::MissingCredential("marketplace"));
        };

        tracing::debug!(%endpoint, "fetching marketplace data");
        let request = self.http.get(url).bearer_auth(key);
        let body = self
            .http
            .send_json(request, &endpoint)
            .await
            .map_err(|err| {
                tracing::warn!(%endpoint, error = %err, "marketplace request failed");
                err
            })?;

        if !body.is_object() {
            return Err(FetchError::decode(&endpoint, "expected a JSON object"));
        }
        Ok(body)
    }
}

/// Collapses a failed fetch into an empty page, logging the failure. Only
/// for auxiliary lists whose failure must not surface to the user.
pub fn or_empty(result: Result<CollectionPage, FetchError>, what: &str) -> CollectionPage {
    result.unwrap_or_else(|err| {
        tracing::warn!(what, error = %err, "masking fetch failure as empty result");
        CollectionPage::default()
    })
}
