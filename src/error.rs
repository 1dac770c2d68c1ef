//! Error types for the sweeper

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the sweeper
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Account resolution errors
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    // Outbound request errors
    #[error("Rate limit exceeded after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },

    #[error("Network failure: {0}")]
    Network(String),

    // Pipeline errors
    #[error("Fee estimation failed: {0}")]
    FeeEstimation(String),

    #[error("Insufficient balance for transaction fees")]
    InsufficientFunds,

    #[error("Broadcast rejected: {0}")]
    BroadcastRejected(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl Error {
    /// The message recorded in an account report when this error ends
    /// an account's pipeline.
    ///
    /// Rejection reasons are reported verbatim, as delivered by the
    /// broadcast service.
    pub fn report_message(&self) -> String {
        match self {
            Error::BroadcastRejected(reason) => reason.clone(),
            other => other.to_string(),
        }
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
