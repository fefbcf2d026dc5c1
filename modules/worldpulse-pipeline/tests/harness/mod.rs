//! Scripted in-process backend for pipeline integration tests.
//!
//! Every call sleeps on tokio time, so tests run with `start_paused = true`
//! and timing assertions are exact. The fake records how many calls were in
//! flight at once and when each call started and ended.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;
use worldpulse_client::{BatchResponse, FetchError, Result, SentimentPayload};
use worldpulse_common::{CountryFeature, CountryKey, GeometryLabel, SentimentRecord, WorldAtlas};
use worldpulse_pipeline::{PipelineEvent, SentimentSource};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
struct Script {
    score: f64,
    failures_before_success: usize,
    delay: Duration,
    answer_as: Option<CountryKey>,
}

#[derive(Debug, Clone)]
pub struct CallSpan {
    pub key: CountryKey,
    pub topic: String,
    pub started: Instant,
    pub ended: Instant,
}

#[derive(Default)]
pub struct FakeSource {
    scripts: HashMap<CountryKey, Script>,
    topic_delays: HashMap<String, Duration>,
    countries: Option<Vec<CountryKey>>,
    batch: Option<Vec<SentimentPayload>>,
    attempts: Mutex<HashMap<CountryKey, usize>>,
    calls: Mutex<Vec<CallSpan>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    countries_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn country(mut self, key: &str, score: f64) -> Self {
        self.scripts.insert(
            CountryKey::from(key),
            Script {
                score,
                failures_before_success: 0,
                delay: DEFAULT_DELAY,
                answer_as: None,
            },
        );
        self
    }

    /// Fail the first `failures` attempts for `key`, then answer with `score`.
    pub fn flaky(mut self, key: &str, failures: usize, score: f64) -> Self {
        self = self.country(key, score);
        if let Some(script) = self.scripts.get_mut(&CountryKey::from(key)) {
            script.failures_before_success = failures;
        }
        self
    }

    pub fn delay(mut self, key: &str, delay: Duration) -> Self {
        if let Some(script) = self.scripts.get_mut(&CountryKey::from(key)) {
            script.delay = delay;
        }
        self
    }

    /// Extra latency added to every call for `topic`.
    pub fn topic_delay(mut self, topic: &str, delay: Duration) -> Self {
        self.topic_delays.insert(topic.to_string(), delay);
        self
    }

    /// Answer requests for `key` with a record labelled `other`.
    pub fn mislabel(mut self, key: &str, other: &str) -> Self {
        if let Some(script) = self.scripts.get_mut(&CountryKey::from(key)) {
            script.answer_as = Some(CountryKey::from(other));
        }
        self
    }

    /// Scripted `/countries` answer. Without this the call fails.
    pub fn countries_list(mut self, keys: &[&str]) -> Self {
        self.countries = Some(keys.iter().map(|k| CountryKey::from(*k)).collect());
        self
    }

    pub fn batch(mut self, results: Vec<SentimentPayload>) -> Self {
        self.batch = Some(results);
        self
    }

    pub fn attempts(&self, key: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(&CountryKey::from(key))
            .copied()
            .unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn countries_calls(&self) -> usize {
        self.countries_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<CallSpan> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, key: &str) -> Vec<CallSpan> {
        let key = CountryKey::from(key);
        self.calls().into_iter().filter(|c| c.key == key).collect()
    }
}

#[async_trait]
impl SentimentSource for FakeSource {
    async fn countries(&self) -> Result<Vec<CountryKey>> {
        self.countries_calls.fetch_add(1, Ordering::SeqCst);
        self.countries
            .clone()
            .ok_or_else(|| FetchError::Network("connection refused".to_string()))
    }

    async fn sentiment_country(&self, topic: &str, country: &CountryKey) -> Result<SentimentRecord> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(country.clone()).or_insert(0);
            *n += 1;
            *n
        };
        let script = self.scripts.get(country).cloned();

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let started = Instant::now();

        let delay = script.as_ref().map_or(DEFAULT_DELAY, |s| s.delay)
            + self.topic_delays.get(topic).copied().unwrap_or_default();
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(CallSpan {
            key: country.clone(),
            topic: topic.to_string(),
            started,
            ended: Instant::now(),
        });

        let Some(script) = script else {
            return Err(FetchError::Api {
                status: 404,
                message: format!("unknown country {country}"),
            });
        };
        if attempt <= script.failures_before_success {
            return Err(FetchError::Network(format!(
                "scripted failure {attempt} for {country}"
            )));
        }
        Ok(record(
            script.answer_as.unwrap_or_else(|| country.clone()).as_str(),
            topic,
            script.score,
        ))
    }

    async fn sentiment_batch(
        &self,
        topic: &str,
        _limit: usize,
        _countries: Option<&[CountryKey]>,
    ) -> Result<BatchResponse> {
        let results = self
            .batch
            .clone()
            .ok_or_else(|| FetchError::Api {
                status: 500,
                message: "batch unavailable".to_string(),
            })?;
        Ok(BatchResponse {
            topic: topic.to_string(),
            results,
        })
    }
}

pub fn record(key: &str, topic: &str, score: f64) -> SentimentRecord {
    SentimentRecord {
        country_key: CountryKey::from(key),
        topic: topic.to_string(),
        score,
        summary: format!("{topic} in {key}"),
        keywords: vec![topic.to_string()],
    }
}

pub fn payload(key: &str, topic: &str, score: f64) -> SentimentPayload {
    SentimentPayload {
        country: key.to_string(),
        topic: topic.to_string(),
        sentiment_score: score,
        summary: format!("{topic} in {key}"),
        keywords: vec![topic.to_string()],
    }
}

pub fn keys(names: &[&str]) -> Vec<CountryKey> {
    names.iter().map(|n| CountryKey::from(*n)).collect()
}

/// An atlas with one square polygon per label.
pub fn atlas(labels: &[&str]) -> WorldAtlas {
    WorldAtlas::new(
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let x = i as f64 * 10.0;
                let geometry: Value = json!({
                    "type": "Polygon",
                    "coordinates": [[[x, 0.0], [x + 2.0, 0.0], [x + 2.0, 2.0], [x, 2.0]]]
                });
                CountryFeature::new(GeometryLabel::from(*label), geometry)
            })
            .collect(),
    )
}

pub fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn shared(source: FakeSource) -> Arc<FakeSource> {
    Arc::new(source)
}
