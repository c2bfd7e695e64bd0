use thiserror::Error;

/// Errors raised while loading flag data. Evaluation itself never fails; callers
/// that hit one of these degrade every requested flag to `false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlagError {
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Failed to parse data")]
    DataParsingError,
    #[error("Flag {key} has rollout percentage {value}, expected 0-100")]
    InvalidRolloutPercentage { key: String, value: i64 },
    #[error("Flag source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Timed out while fetching data")]
    TimeoutError,
}

impl FlagError {
    /// Short, low-cardinality label for metrics.
    pub fn error_code(&self) -> &'static str {
        match self {
            FlagError::Internal(_) => "internal_error",
            FlagError::DataParsingError => "data_parsing_error",
            FlagError::InvalidRolloutPercentage { .. } => "invalid_rollout_percentage",
            FlagError::SourceUnavailable(_) => "source_unavailable",
            FlagError::TimeoutError => "timeout",
        }
    }
}

impl From<serde_json::Error> for FlagError {
    fn from(e: serde_json::Error) -> Self {
        tracing::error!("failed to deserialize flag data: {}", e);
        FlagError::DataParsingError
    }
}
