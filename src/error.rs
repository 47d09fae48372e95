use thiserror::Error;

/// Errors surfaced to the caller. Validation degradation (a missing or
/// unparsable sequence id) is not an error; it resolves to a failed verdict
/// inside [`crate::evaluate_submission`].
#[derive(Debug, Error)]
pub enum FormGuardError {
    /// Setup problem, such as an unparsable scoring-server URL.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The scoring service responded without a success indicator. Carries
    /// the service's error messages, newline-joined.
    #[error("scoring service rejected submission: {0}")]
    Rejected(String),

    /// Network or HTTP failure talking to the scoring service.
    #[error("scoring request failed: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl FormGuardError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn transport_caused(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
