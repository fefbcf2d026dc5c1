use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorldPulseError>;

#[derive(Error, Debug)]
pub enum WorldPulseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    /// No world geometry could be loaded. The globe has nothing to render.
    #[error("World geometry unavailable: {0}")]
    WorldUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
