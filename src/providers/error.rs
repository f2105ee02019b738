use thiserror::Error;

/// Failure reported by a provider search.
///
/// These never escape the registry; they are logged and the provider is skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

impl ProviderError {
    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::NotConfigured(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Whether retrying later could succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::NotConfigured(_) | Self::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for ProviderError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => e.into(),
            reqwest_middleware::Error::Middleware(e) => ProviderError::Network(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ProviderError::api(503, "unavailable").to_string(),
            "API error 503: unavailable"
        );
        assert_eq!(ProviderError::Timeout(10).to_string(), "Timed out after 10s");
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::network("reset").is_transient());
        assert!(ProviderError::api(500, "boom").is_transient());
        assert!(ProviderError::api(429, "slow down").is_transient());
        assert!(!ProviderError::api(403, "denied").is_transient());
        assert!(!ProviderError::parse("bad json").is_transient());
        assert!(!ProviderError::not_configured("no key").is_transient());
    }
}
