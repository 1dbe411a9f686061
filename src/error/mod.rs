//! Error types for mathchat.

pub mod unified;

pub use unified::{ErrorCategory, OperationErrorKind, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for everything that can abort a query.
///
/// Failures of a single operation are *not* represented here: they travel
/// back to the decision-maker as [`crate::types::OperationFailure`] values.
#[derive(Error, Debug)]
pub enum MathChatError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Decision maker unavailable: {message}")]
    DecisionMakerUnavailable { message: String },

    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Control loop exceeded {limit} iterations without a final answer")]
    IterationLimitExceeded { limit: usize },

    #[error("Query cancelled")]
    Cancelled,
}

impl MathChatError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Transport { .. } => ErrorCategory::Transport,
            Self::DecisionMakerUnavailable { .. } => ErrorCategory::DecisionMaker,
            Self::IterationLimitExceeded { .. } | Self::InvalidState(_) => ErrorCategory::Protocol,
            Self::Cancelled => ErrorCategory::Cancelled,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
                | ErrorCategory::Transport
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit
            | ErrorCategory::Network
            | ErrorCategory::Server
            | ErrorCategory::DecisionMaker => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Transport => RecoverySuggestion::CheckToolServer,
            ErrorCategory::Protocol => RecoverySuggestion::RephraseQuery,
            _ => RecoverySuggestion::None,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, MathChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_status_drives_category() {
        assert_eq!(MathChatError::api(401, "no").category(), ErrorCategory::Authentication);
        assert_eq!(MathChatError::api(429, "slow").category(), ErrorCategory::RateLimit);
        assert_eq!(MathChatError::api(503, "down").category(), ErrorCategory::Server);
        assert_eq!(MathChatError::api(400, "bad").category(), ErrorCategory::Api);
    }

    #[test]
    fn transport_and_timeouts_are_retryable() {
        assert!(MathChatError::transport("closed").is_retryable());
        assert!(MathChatError::Timeout(10).is_retryable());
        assert!(MathChatError::api(502, "bad gateway").is_retryable());
    }

    #[test]
    fn loop_level_failures_are_not_retryable() {
        assert!(!MathChatError::Cancelled.is_retryable());
        assert!(!MathChatError::IterationLimitExceeded { limit: 3 }.is_retryable());
        assert!(!MathChatError::Authentication("bad key".into()).is_retryable());
        assert!(!MathChatError::DecisionMakerUnavailable {
            message: "gave up".into()
        }
        .is_retryable());
    }

    #[test]
    fn iteration_limit_message_names_the_limit() {
        let err = MathChatError::IterationLimitExceeded { limit: 7 };
        assert_eq!(
            err.to_string(),
            "Control loop exceeded 7 iterations without a final answer"
        );
        assert_eq!(err.recovery_suggestion(), RecoverySuggestion::RephraseQuery);
    }
}
