use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum MarketDataError {
    /// Unregistered limiter key, uninitialized cache, or an invalid setting.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Rate limit exceeded for [{key}]: retry in {retry_after_ms}ms")]
    RateLimitExceeded { key: String, retry_after_ms: i64 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("Upstream API error: {0}")]
    Upstream(String),
}

impl MarketDataError {
    /// Errors a caller can recover from by retrying or falling back to uncached work.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. } | Self::Storage(_) | Self::Upstream(_)
        )
    }

    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Self::RateLimitExceeded { retry_after_ms, .. } => Some(
                std::time::Duration::from_millis((*retry_after_ms).max(0) as u64),
            ),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for MarketDataError {
    fn from(err: sqlx::Error) -> Self {
        MarketDataError::Storage(err.to_string())
    }
}

impl From<bincode::Error> for MarketDataError {
    fn from(err: bincode::Error) -> Self {
        MarketDataError::Storage(format!("Cache payload codec error: {}", err))
    }
}

impl From<reqwest::Error> for MarketDataError {
    fn from(err: reqwest::Error) -> Self {
        MarketDataError::Upstream(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for MarketDataError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        MarketDataError::Storage("Operation timed out".to_string())
    }
}

pub type Result<T> = std::result::Result<T, MarketDataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_recoverable_with_retry_hint() {
        let err = MarketDataError::RateLimitExceeded {
            key: "marvel".to_string(),
            retry_after_ms: 1500,
        };
        assert!(err.is_recoverable());
        assert_eq!(err.retry_after(), Some(std::time::Duration::from_millis(1500)));
    }

    #[test]
    fn configuration_and_precondition_are_not_recoverable() {
        assert!(!MarketDataError::Configuration("x".into()).is_recoverable());
        assert!(!MarketDataError::PreconditionViolation("x".into()).is_recoverable());
        assert_eq!(MarketDataError::Storage("x".into()).retry_after(), None);
    }

    #[test]
    fn codec_failures_map_to_storage_without_blaming_the_record() {
        let decode_err = bincode::deserialize::<Vec<u64>>(&[0xff]).unwrap_err();
        let err = MarketDataError::from(decode_err);
        assert!(matches!(err, MarketDataError::Storage(_)));
        assert!(err.to_string().starts_with("Storage error: Cache payload codec error"));
        assert!(!err.to_string().contains("Corrupted"));
    }
}
