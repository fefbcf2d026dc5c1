use thiserror::Error;
use worldpulse_client::FetchError;
use worldpulse_common::WorldPulseError;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Common(#[from] WorldPulseError),
}
