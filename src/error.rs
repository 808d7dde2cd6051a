use thiserror::Error;

/// Every failure the dashboard can report.
///
/// Each variant maps to a process exit code so the binary can stay a thin
/// wrapper around the library (see `main.rs`).
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Invalid window parameters or input values, raised before any computation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Empty or failed market-data fetch. Nothing downstream can run.
    #[error("market data unavailable: {0}")]
    DataUnavailable(String),

    /// A collaborator (sentiment API, outlier model, sequence model) failed.
    #[error("{service} failed: {message}")]
    ExternalService { service: String, message: String },

    /// Not enough rows for the requested window.
    #[error("insufficient data: need {needed} rows, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("{0}")]
    Io(String),

    #[error("terminal error: {0}")]
    Terminal(String),

    /// A broken invariant between pipeline stages.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::DataUnavailable(message.into())
    }

    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self::Terminal(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Internal(_) => 1,
            AppError::Configuration(_) => 2,
            AppError::DataUnavailable(_) => 3,
            AppError::ExternalService { .. } | AppError::InsufficientData { .. } => 4,
            AppError::Io(_) | AppError::Terminal(_) => 5,
        }
    }

    /// Fatal errors abort the run before any chart is built.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Configuration(_) | AppError::DataUnavailable(_) | AppError::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(AppError::config("bad window").exit_code(), 2);
        assert_eq!(AppError::unavailable("empty").exit_code(), 3);
        assert_eq!(AppError::external("sentiment", "timeout").exit_code(), 4);
        assert_eq!(
            AppError::InsufficientData { needed: 31, available: 10 }.exit_code(),
            4
        );
        assert_eq!(AppError::io("disk full").exit_code(), 5);
        assert_eq!(AppError::internal("row mismatch").exit_code(), 1);
    }

    #[test]
    fn configuration_data_and_internal_errors_are_fatal() {
        assert!(AppError::config("x").is_fatal());
        assert!(AppError::unavailable("x").is_fatal());
        assert!(AppError::internal("x").is_fatal());
        assert!(!AppError::external("sentiment", "x").is_fatal());
        assert!(!AppError::InsufficientData { needed: 2, available: 1 }.is_fatal());
    }

    #[test]
    fn external_error_message_names_the_service() {
        let err = AppError::external("sentiment", "status 503");
        assert_eq!(err.to_string(), "sentiment failed: status 503");
    }
}
