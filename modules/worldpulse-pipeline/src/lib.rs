//! Progressive geo-sentiment aggregation.
//!
//! A run fans a topic out over many country keys under a concurrency cap,
//! folds each settled response into an epoch-guarded [`ResultIndex`], and
//! publishes a [`PipelineEvent`] after every state change so a renderer can
//! repaint incrementally.

pub mod error;
pub mod highlight;
pub mod history;
pub mod index;
pub mod manifest;
pub mod orchestrator;
pub mod publisher;
pub mod render;
pub mod session;
pub mod source;

pub use error::{PipelineError, Result};
pub use highlight::{HighlightState, Highlighter};
pub use history::{JsonFileStore, KeyValueStore, MemoryStore, TopicHistory};
pub use index::{Acceptance, IndexSnapshot, ResultIndex};
pub use manifest::{KeyOutcome, Outcome, RunManifest};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use publisher::{ChannelPublisher, NoopPublisher, PipelineEvent, RepaintPublisher};
pub use render::{project, PolygonStyle};
pub use session::{CountryDetail, Session};
pub use source::SentimentSource;
