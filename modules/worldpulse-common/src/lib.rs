pub mod aliases;
pub mod atlas;
pub mod band;
pub mod config;
pub mod error;
pub mod types;

pub use aliases::resolve;
pub use atlas::{CountryFeature, FeatureRef, LatLng, WorldAtlas};
pub use band::SentimentBand;
pub use config::{
    AppConfig, FileConfig, HighlightConfig, HistoryConfig, PipelineConfig, RetryConfig,
    RetrySettings, WorldConfig,
};
pub use error::{Result, WorldPulseError};
pub use types::*;
