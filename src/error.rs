use thiserror::Error;

/// Failure reaching or reading one upstream endpoint.
///
/// Every variant is a transport-class failure from the caller's point of
/// view. A missing credential cannot be told apart from a rejected request
/// once it reaches the presentation layer, so it is reported here as well.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("missing {0} credential")]
    MissingCredential(&'static str),

    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("http {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

impl FetchError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredential(_) | Self::Url(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub(crate) fn decode(endpoint: &str, reason: impl Into<String>) -> Self {
        Self::Decode {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else if err.is_decode() {
            Self::decode(endpoint, err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            }
        } else {
            Self::Transport {
                endpoint: endpoint.to_string(),
                source: err,
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("wallet address is empty")]
    EmptyAddress,

    #[error("gas total of {0} wei does not fit a decimal")]
    GasOverflow(u128),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_configuration_failures() {
        assert!(FetchError::MissingCredential("marketplace").is_configuration());
        assert!(FetchError::Url(url::ParseError::EmptyHost).is_configuration());
        let status = FetchError::Status {
            endpoint: "https://api.example.com/collections/v7".into(),
            status: 503,
        };
        assert!(!status.is_configuration());
        assert!(!status.is_timeout());
    }
}
