//! Error types module
//!
//! Every failure a caption invocation can produce is a variant of
//! [`CaptionError`]. All of them are terminal: nothing is retried and nothing
//! is logged and swallowed. The host decides how to present them.

use std::path::PathBuf;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors such as bad host input
    Debug,
    /// Recoverable by the operator (fix the `.env`, pick another model)
    Warn,
    /// Unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    /// The API key could not be resolved. Raised before any network activity.
    #[error("OPENAI_API_KEY not found. Checked: {}", format_checked(.checked))]
    Configuration { checked: Vec<PathBuf> },

    /// The remote call failed (connection, HTTP status or undecodable body).
    #[error("OpenAI API call failed: {0}")]
    Transport(String),

    /// The remote call succeeded but produced no caption text.
    #[error("No caption text returned from OpenAI API.")]
    EmptyResult,

    #[error("Image encoding error: {0}")]
    ImageEncoding(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn format_checked(paths: &[PathBuf]) -> String {
    let joined = paths
        .iter()
        .map(|p| format!("'{}'", p.display()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", joined)
}

impl CaptionError {
    /// Machine-readable error code (e.g., "CONFIGURATION_ERROR")
    pub fn error_code(&self) -> &'static str {
        match self {
            CaptionError::Configuration { .. } => "CONFIGURATION_ERROR",
            CaptionError::Transport(_) => "TRANSPORT_ERROR",
            CaptionError::EmptyResult => "EMPTY_RESULT",
            CaptionError::ImageEncoding(_) => "IMAGE_ENCODING_ERROR",
            CaptionError::InvalidInput(_) => "INVALID_INPUT",
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            CaptionError::InvalidInput(_) | CaptionError::ImageEncoding(_) => LogLevel::Debug,
            CaptionError::Configuration { .. } | CaptionError::EmptyResult => LogLevel::Warn,
            CaptionError::Transport(_) => LogLevel::Error,
        }
    }

    /// Whether the failure happened before anything was sent to the service
    pub fn is_local(&self) -> bool {
        !matches!(
            self,
            CaptionError::Transport(_) | CaptionError::EmptyResult
        )
    }
}

pub type CaptionResult<T> = Result<T, CaptionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_lists_checked_paths() {
        let err = CaptionError::Configuration {
            checked: vec![PathBuf::from("/opt/host/.env"), PathBuf::from(".env")],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("OPENAI_API_KEY not found."));
        assert!(msg.contains("'/opt/host/.env'"));
        assert!(msg.contains("'.env'"));
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert!(err.is_local());
    }

    #[test]
    fn test_transport_error_keeps_original_message() {
        let err = CaptionError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "OpenAI API call failed: connection refused");
        assert_eq!(err.log_level(), LogLevel::Error);
        assert!(!err.is_local());
    }

    #[test]
    fn test_empty_result_message() {
        assert_eq!(
            CaptionError::EmptyResult.to_string(),
            "No caption text returned from OpenAI API."
        );
    }
}
