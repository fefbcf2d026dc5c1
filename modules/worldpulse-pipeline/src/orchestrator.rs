//! Bounded-concurrency fan-out of one topic over many country keys.
//!
//! Keys are started in input order with at most `concurrency` requests in
//! flight; each freed slot is refilled immediately. Completion order is
//! whatever the network gives us. Every settlement is folded into the shared
//! [`ResultIndex`] under the run's epoch and published before the next one is
//! looked at. One key failing never aborts the run.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use worldpulse_client::{fetch_with_retries, FetchError, RetryPolicy};
use worldpulse_common::{CountryKey, FileConfig, RunEpoch, SentimentRecord, WorldAtlas};

use crate::error::Result;
use crate::index::{Acceptance, ResultIndex};
use crate::manifest::{KeyOutcome, Outcome, RunManifest};
use crate::publisher::{PipelineEvent, RepaintPublisher};
use crate::source::SentimentSource;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub concurrency: usize,
    pub max_countries: usize,
    pub country_retry: RetryPolicy,
    pub countries_retry: RetryPolicy,
    pub batch_retry: RetryPolicy,
}

impl From<&FileConfig> for OrchestratorConfig {
    fn from(config: &FileConfig) -> Self {
        Self {
            concurrency: config.pipeline.concurrency,
            max_countries: config.pipeline.max_countries,
            country_retry: config.retries.country.into(),
            countries_retry: config.retries.countries.into(),
            batch_retry: config.retries.batch.into(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&FileConfig::default())
    }
}

pub struct Orchestrator {
    source: Arc<dyn SentimentSource>,
    index: Arc<ResultIndex>,
    publisher: Arc<dyn RepaintPublisher>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn SentimentSource>,
        index: Arc<ResultIndex>,
        publisher: Arc<dyn RepaintPublisher>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            source,
            index,
            publisher,
            config,
        }
    }

    pub fn index(&self) -> &Arc<ResultIndex> {
        &self.index
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Analyse `topic` over an explicit key list with the given parallelism.
    pub async fn run(&self, topic: &str, keys: Vec<CountryKey>, concurrency: usize) -> RunManifest {
        let epoch = self.begin(topic, keys.len());
        self.fan_out(epoch, topic, keys, concurrency).await
    }

    /// Progressive analysis over the backend's key universe.
    ///
    /// If `/countries` fails or is empty, falls back to the resolved keys of
    /// the loaded geometry (when an atlas is given).
    pub async fn analyze(&self, topic: &str, atlas: Option<&WorldAtlas>) -> RunManifest {
        // Index starts empty for the new topic before the key list is known.
        let epoch = self.index.begin_run();
        let keys = self.country_keys(atlas).await;

        self.announce(epoch, topic, keys.len());
        self.fan_out(epoch, topic, keys, self.config.concurrency).await
    }

    /// Non-progressive mode: a single `/sentiment` call, folded into the index
    /// under the same epoch contract. Fails only if the batch call itself does.
    pub async fn analyze_batch(
        &self,
        topic: &str,
        limit: usize,
        countries: Option<&[CountryKey]>,
    ) -> Result<RunManifest> {
        let requested = countries.map_or(limit, |c| c.len().min(limit));
        let epoch = self.begin(topic, requested);

        let fetched = fetch_with_retries("sentiment_batch", self.config.batch_retry, move || {
            self.source.sentiment_batch(topic, limit, countries)
        })
        .await;
        let response = match fetched {
            Ok(response) => response,
            Err(e) => {
                if self.is_current(epoch) {
                    self.publisher.publish(PipelineEvent::RunFailed {
                        epoch,
                        error: e.to_string(),
                    });
                }
                return Err(e.into());
            }
        };

        let mut manifest = RunManifest::empty(epoch, topic);
        for payload in response.results {
            let key = CountryKey::new(payload.country.clone());
            let result = payload.into_record().and_then(|record| match countries {
                Some(allowed) if !allowed.contains(&key) => Err(FetchError::Decode(format!(
                    "backend returned unrequested country {key}"
                ))),
                _ => Ok(record),
            });
            manifest.outcomes.push(self.settle(epoch, key, result));
        }

        self.complete(&manifest);
        Ok(manifest)
    }

    /// Empty the index and invalidate anything still in flight.
    pub fn clear(&self) {
        self.index.reset();
        info!("Cleared sentiment results");
        self.publisher.publish(PipelineEvent::Cleared);
    }

    fn begin(&self, topic: &str, total: usize) -> RunEpoch {
        let epoch = self.index.begin_run();
        self.announce(epoch, topic, total);
        epoch
    }

    fn announce(&self, epoch: RunEpoch, topic: &str, total: usize) {
        info!(topic, %epoch, keys = total, "Starting sentiment run");
        self.publisher.publish(PipelineEvent::RunStarted {
            epoch,
            topic: topic.to_string(),
            total,
        });
    }

    /// Superseded runs settle silently: their results change nothing.
    fn is_current(&self, epoch: RunEpoch) -> bool {
        self.index.current_epoch() == epoch
    }

    async fn country_keys(&self, atlas: Option<&WorldAtlas>) -> Vec<CountryKey> {
        let max = self.config.max_countries;
        let fetched = fetch_with_retries("countries", self.config.countries_retry, move || {
            self.source.countries()
        })
        .await;

        match fetched {
            Ok(keys) if !keys.is_empty() => keys.into_iter().take(max).collect(),
            Ok(_) => {
                warn!("Backend listed no countries, falling back to geometry labels");
                atlas.map(|a| a.fallback_keys(max)).unwrap_or_default()
            }
            Err(e) => {
                warn!(error = %e, "/countries failed, falling back to geometry labels");
                atlas.map(|a| a.fallback_keys(max)).unwrap_or_default()
            }
        }
    }

    async fn fan_out(
        &self,
        epoch: RunEpoch,
        topic: &str,
        keys: Vec<CountryKey>,
        concurrency: usize,
    ) -> RunManifest {
        let concurrency = if concurrency == 0 {
            warn!("Concurrency limit of 0 requested, using 1");
            1
        } else {
            concurrency
        };

        let mut manifest = RunManifest::empty(epoch, topic);
        manifest.outcomes.reserve(keys.len());

        let tasks = keys.into_iter().map(|key| self.fetch_one(topic, key));
        let mut settled = stream::iter(tasks).buffer_unordered(concurrency);
        while let Some((key, result)) = settled.next().await {
            manifest.outcomes.push(self.settle(epoch, key, result));
        }

        self.complete(&manifest);
        manifest
    }

    async fn fetch_one(
        &self,
        topic: &str,
        key: CountryKey,
    ) -> (CountryKey, std::result::Result<SentimentRecord, FetchError>) {
        let requested = &key;
        let result = fetch_with_retries("sentiment_country", self.config.country_retry, move || async move {
            match self.source.sentiment_country(topic, requested).await {
                Ok(record) if &record.country_key != requested => Err(FetchError::Decode(format!(
                    "asked for {requested}, backend answered for {}",
                    record.country_key
                ))),
                other => other,
            }
        })
        .await;
        (key, result)
    }

    fn settle(
        &self,
        epoch: RunEpoch,
        key: CountryKey,
        result: std::result::Result<SentimentRecord, FetchError>,
    ) -> KeyOutcome {
        let outcome = match result {
            Ok(record) => {
                let score = record.score;
                match self.index.accept(epoch, record.clone()) {
                    Acceptance::Accepted => {
                        debug!(country = %key, score, "Accepted sentiment");
                        self.publisher
                            .publish(PipelineEvent::RecordAccepted { epoch, record });
                        Outcome::Accepted { score }
                    }
                    Acceptance::Stale { current } => {
                        debug!(country = %key, %epoch, %current, "Discarded stale sentiment");
                        Outcome::Stale { score }
                    }
                }
            }
            Err(e) => {
                warn!(country = %key, %epoch, error = %e, "Country sentiment failed");
                if self.is_current(epoch) {
                    self.publisher.publish(PipelineEvent::KeyFailed {
                        epoch,
                        key: key.clone(),
                        error: e.to_string(),
                    });
                }
                Outcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        KeyOutcome { key, outcome }
    }

    fn complete(&self, manifest: &RunManifest) {
        let (succeeded, failed) = (manifest.succeeded(), manifest.failed());
        info!(
            topic = %manifest.topic,
            epoch = %manifest.epoch,
            succeeded,
            failed,
            "Sentiment run settled"
        );
        if self.is_current(manifest.epoch) {
            self.publisher.publish(PipelineEvent::RunCompleted {
                epoch: manifest.epoch,
                succeeded,
                failed,
            });
        }
    }
}
