//! One user's view of the globe: the loaded geometry, the current topic's
//! results, the highlight and the topic history, wired together.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use worldpulse_common::{
    CountryKey, FeatureRef, FileConfig, GeometryLabel, HighlightConfig, LatLng, SentimentBand,
    SentimentRecord, WorldAtlas,
};

use crate::error::Result;
use crate::highlight::Highlighter;
use crate::history::{KeyValueStore, TopicHistory};
use crate::index::{IndexSnapshot, ResultIndex};
use crate::manifest::RunManifest;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::publisher::RepaintPublisher;
use crate::render::{project, PolygonStyle};
use crate::source::SentimentSource;

/// History entry recorded when an empty topic resets the globe.
pub const CLEARED_MARKER: &str = "(cleared)";

/// What the side panel shows for a clicked country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryDetail {
    pub label: GeometryLabel,
    pub key: CountryKey,
    pub centroid: LatLng,
    pub band: SentimentBand,
    pub record: Option<SentimentRecord>,
}

pub struct Session {
    orchestrator: Orchestrator,
    highlighter: Highlighter,
    atlas: WorldAtlas,
    history: TopicHistory<Arc<dyn KeyValueStore>>,
    progressive: bool,
    highlight: HighlightConfig,
}

impl Session {
    pub fn new(
        source: Arc<dyn SentimentSource>,
        publisher: Arc<dyn RepaintPublisher>,
        atlas: WorldAtlas,
        store: Arc<dyn KeyValueStore>,
        config: &FileConfig,
    ) -> Self {
        let orchestrator = Orchestrator::new(
            source,
            Arc::new(ResultIndex::new()),
            Arc::clone(&publisher),
            OrchestratorConfig::from(config),
        );
        Self {
            orchestrator,
            highlighter: Highlighter::new(publisher),
            atlas,
            history: TopicHistory::new(store, config.history.max_entries),
            progressive: config.pipeline.progressive,
            highlight: config.highlight.clone(),
        }
    }

    /// Analyse `topic` and record it in the history. A blank topic clears the
    /// globe instead and returns `None`.
    pub async fn analyze(&self, topic: &str) -> Result<Option<RunManifest>> {
        self.run(topic, None).await
    }

    /// Like [`Session::analyze`], over `keys` instead of the backend's list.
    pub async fn analyze_countries(
        &self,
        topic: &str,
        keys: Vec<CountryKey>,
    ) -> Result<Option<RunManifest>> {
        self.run(topic, Some(keys)).await
    }

    async fn run(&self, topic: &str, keys: Option<Vec<CountryKey>>) -> Result<Option<RunManifest>> {
        let topic = topic.trim();
        if topic.is_empty() {
            self.clear();
            self.record_history(CLEARED_MARKER);
            return Ok(None);
        }

        let config = self.orchestrator.config();
        let manifest = match (self.progressive, keys) {
            (true, None) => self.orchestrator.analyze(topic, Some(&self.atlas)).await,
            (true, Some(keys)) => self.orchestrator.run(topic, keys, config.concurrency).await,
            (false, keys) => {
                self.orchestrator
                    .analyze_batch(topic, config.max_countries, keys.as_deref())
                    .await?
            }
        };

        self.record_history(topic);
        Ok(Some(manifest))
    }

    /// The run already happened; a history write failure must not undo it.
    fn record_history(&self, topic: &str) {
        if let Err(e) = self.history.push(topic) {
            warn!(topic, error = %e, "Failed to record topic history");
        }
    }

    pub fn clear(&self) {
        self.orchestrator.clear();
        self.highlighter.clear();
    }

    /// Highlight the country matching `query` and return it, if any.
    pub fn fly_to(&self, query: &str) -> Option<FeatureRef> {
        let feature = self.atlas.find(query)?;
        if let Some(country) = self.atlas.feature(feature) {
            info!(
                country = %country.label,
                lat = country.centroid.lat,
                lng = country.centroid.lng,
                "Flying to country"
            );
        }
        self.highlighter
            .select(feature, Duration::from_millis(self.highlight.fly_to_ms));
        Some(feature)
    }

    /// A click on a polygon: highlight it briefly and return its detail.
    pub fn select_feature(&self, feature: FeatureRef) -> Option<CountryDetail> {
        let detail = self.detail(feature)?;
        self.highlighter
            .select(feature, Duration::from_millis(self.highlight.click_ms));
        Some(detail)
    }

    /// Returns false, leaving the highlight alone, for a handle that does
    /// not belong to this session's atlas.
    pub fn highlight(&self, feature: FeatureRef) -> bool {
        if self.atlas.feature(feature).is_none() {
            warn!(index = feature.index(), "Ignoring highlight of unknown feature");
            return false;
        }
        self.highlighter
            .select(feature, Duration::from_millis(self.highlight.default_ms));
        true
    }

    pub fn detail(&self, feature: FeatureRef) -> Option<CountryDetail> {
        let country = self.atlas.feature(feature)?;
        let record = self.snapshot().get(&country.key).cloned();
        Some(CountryDetail {
            label: country.label.clone(),
            key: country.key.clone(),
            centroid: country.centroid,
            band: SentimentBand::from_score(record.as_ref().map(|r| r.score)),
            record,
        })
    }

    pub fn styles(&self) -> Vec<PolygonStyle> {
        project(&self.atlas, &self.snapshot(), self.highlighter.current())
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        self.orchestrator.index().snapshot()
    }

    pub fn atlas(&self) -> &WorldAtlas {
        &self.atlas
    }

    pub fn history(&self) -> &TopicHistory<Arc<dyn KeyValueStore>> {
        &self.history
    }

    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }
}
