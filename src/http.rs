use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use url::Url;

use crate::error::FetchError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared HTTP client. Every request carries the configured timeout, and a
/// timeout is reported like any other transport failure.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .no_proxy()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|err| FetchError::from_reqwest("client builder", err))?;
        Ok(Self { client })
    }

    pub fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url).header("accept", "*/*")
    }

    /// Sends the request and parses the body as JSON. Non-2xx responses are
    /// errors; the body of a failed response is only logged.
    pub async fn send_json(&self, request: RequestBuilder, endpoint: &str) -> Result<Value, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(endpoint, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(endpoint, status = status.as_u16(), body = %truncate(&body, 200), "upstream rejected request");
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| FetchError::from_reqwest(endpoint, err))
    }
}

/// Scheme, host and path of a url. Query strings can carry api keys, so
/// they never reach the logs.
pub fn endpoint_label(url: &Url) -> String {
    format!(
        "{}://{}{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        url.path()
    )
}

/// Appends path segments to a base url without dropping the base path,
/// which `Url::join` would do for a base without a trailing slash.
pub fn extend_path(base: &Url, segments: &[&str]) -> Result<Url, FetchError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| FetchError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
