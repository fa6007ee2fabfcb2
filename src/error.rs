//! Custom error types for rustcnki.
//!
//! All library functions return `Result<T, CnkiError>`; the binary wraps them
//! in `anyhow` at the command boundary.

use thiserror::Error;

/// Main error type for rustcnki operations.
#[derive(Debug, Error)]
pub enum CnkiError {
    /// Browser automation error (launch, CDP, script evaluation)
    #[error("Browser error: {0}")]
    Browser(String),

    /// A wait on the page did not complete in time
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// A required page element is missing
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External API returned an error
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error message from API
        message: String,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unparseable page or API content
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias using `CnkiError`
pub type Result<T> = std::result::Result<T, CnkiError>;

impl From<chromiumoxide::error::CdpError> for CnkiError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        CnkiError::Browser(e.to_string())
    }
}
