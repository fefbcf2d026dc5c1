use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

/// Why a single backend call failed. Every variant is retried alike.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Body arrived but did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The backend answered 200 but reported that its AI call failed.
    #[error("Upstream AI failure: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}
