mod harness;

use std::sync::Arc;
use std::time::Duration;

use worldpulse_common::{CountryKey, FileConfig, Result, SentimentBand, WorldPulseError};
use worldpulse_pipeline::{
    session::CLEARED_MARKER, ChannelPublisher, KeyValueStore, MemoryStore, NoopPublisher,
    PipelineEvent, Session,
};

use harness::{atlas, drain, payload, shared, FakeSource};

fn source() -> Arc<FakeSource> {
    shared(
        FakeSource::new()
            .countries_list(&["USA", "Kenya", "Singapore"])
            .country("USA", 0.1)
            .country("Kenya", -0.6)
            .country("Singapore", 0.5),
    )
}

fn session(source: Arc<FakeSource>, config: &FileConfig) -> Session {
    Session::new(
        source,
        Arc::new(NoopPublisher),
        atlas(&["United States of America", "Kenya", "Singapore", "Chile"]),
        Arc::new(MemoryStore::new()),
        config,
    )
}

#[tokio::test(start_paused = true)]
async fn analyze_paints_globe_and_records_history() {
    let session = session(source(), &FileConfig::default());

    let manifest = session.analyze("  water ").await.unwrap().unwrap();
    assert_eq!(manifest.topic, "water");
    assert_eq!(manifest.succeeded(), 3);

    let bands: Vec<SentimentBand> = session.styles().iter().map(|s| s.band).collect();
    assert_eq!(
        bands,
        vec![
            SentimentBand::Caution,
            SentimentBand::Alarm,
            SentimentBand::Positive,
            SentimentBand::Neutral,
        ]
    );
    assert_eq!(session.history().entries().unwrap(), vec!["water"]);
}

#[tokio::test(start_paused = true)]
async fn blank_topic_clears_everything() {
    let session = session(source(), &FileConfig::default());
    session.analyze("water").await.unwrap();
    let chile = session.fly_to("Chile").unwrap();
    assert_eq!(session.highlighter().current(), Some(chile));

    assert!(session.analyze("   ").await.unwrap().is_none());

    assert!(session.snapshot().is_empty());
    assert_eq!(session.highlighter().current(), None);
    assert_eq!(
        session.history().entries().unwrap(),
        vec![CLEARED_MARKER, "water"]
    );
}

#[tokio::test(start_paused = true)]
async fn fly_to_matches_labels_and_keys_case_insensitively() {
    let (publisher, mut rx) = ChannelPublisher::new();
    let session = Session::new(
        source(),
        Arc::new(publisher),
        atlas(&["United States of America", "Kenya"]),
        Arc::new(MemoryStore::new()),
        &FileConfig::default(),
    );

    let by_label = session.fly_to("  united states of america ").unwrap();
    let by_key = session.fly_to("usa").unwrap();
    assert_eq!(by_label, by_key);
    assert!(session.fly_to("Atlantis").is_none());
    assert!(session.fly_to("").is_none());

    let styles = session.styles();
    assert_eq!(styles[by_key.index()].altitude, 0.08);

    // Fly-to highlights last 2600ms by default.
    tokio::time::sleep(Duration::from_millis(2601)).await;
    assert_eq!(session.highlighter().current(), None);
    assert_eq!(
        drain(&mut rx).last(),
        Some(&PipelineEvent::HighlightChanged { feature: None })
    );
}

#[tokio::test(start_paused = true)]
async fn selecting_a_feature_returns_its_detail() {
    let session = session(source(), &FileConfig::default());
    session.analyze("water").await.unwrap();

    let kenya = session.atlas().find("Kenya").unwrap();
    let detail = session.select_feature(kenya).unwrap();
    assert_eq!(detail.key, CountryKey::from("Kenya"));
    assert_eq!(detail.band, SentimentBand::Alarm);
    assert_eq!(detail.record.map(|r| r.score), Some(-0.6));
    assert_eq!(session.highlighter().current(), Some(kenya));

    let chile = session.atlas().find("Chile").unwrap();
    let detail = session.detail(chile).unwrap();
    assert!(detail.record.is_none());
    assert_eq!(detail.band, SentimentBand::Neutral);
}

#[tokio::test(start_paused = true)]
async fn non_progressive_mode_uses_batch_call() {
    let source = shared(FakeSource::new().batch(vec![
        payload("USA", "food", 0.4),
        payload("Kenya", "food", -0.2),
    ]));
    let mut config = FileConfig::default();
    config.pipeline.progressive = false;
    let session = session(source.clone(), &config);

    let manifest = session.analyze("food").await.unwrap().unwrap();

    assert_eq!(manifest.succeeded(), 2);
    assert_eq!(source.calls().len(), 0);
    assert_eq!(
        session.snapshot().score(&CountryKey::from("USA")),
        Some(0.4)
    );
}

#[tokio::test(start_paused = true)]
async fn failed_batch_call_leaves_history_untouched() {
    let mut config = FileConfig::default();
    config.pipeline.progressive = false;
    let session = session(shared(FakeSource::new()), &config);

    assert!(session.analyze("food").await.is_err());
    assert!(session.history().entries().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn explicit_country_list_skips_backend_listing() {
    let source = source();
    let session = session(source.clone(), &FileConfig::default());

    let manifest = session
        .analyze_countries("water", vec![CountryKey::from("Kenya")])
        .await
        .unwrap()
        .unwrap();

    assert_eq!(manifest.outcomes.len(), 1);
    assert_eq!(source.countries_calls(), 0);
    assert_eq!(source.attempts("USA"), 0);
}

#[tokio::test(start_paused = true)]
async fn plain_highlight_uses_default_duration() {
    let session = session(source(), &FileConfig::default());
    let kenya = session.atlas().find("kenya").unwrap();

    assert!(session.highlight(kenya));
    tokio::time::sleep(Duration::from_millis(2399)).await;
    assert_eq!(session.highlighter().current(), Some(kenya));
    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(session.highlighter().current(), None);
}

/// Reads nothing and refuses every write.
struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: String) -> Result<()> {
        Err(WorldPulseError::Store("disk full".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn history_write_failure_does_not_fail_the_run() {
    let session = Session::new(
        source(),
        Arc::new(NoopPublisher),
        atlas(&["United States of America", "Kenya", "Singapore"]),
        Arc::new(ReadOnlyStore),
        &FileConfig::default(),
    );

    let manifest = session.analyze("water").await.unwrap().unwrap();
    assert_eq!(manifest.succeeded(), 3);
    assert_eq!(session.snapshot().len(), 3);

    assert!(session.analyze("").await.unwrap().is_none());
    assert!(session.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn highlight_ignores_features_from_another_atlas() {
    let session = session(source(), &FileConfig::default());
    let bigger = atlas(&["A", "B", "C", "D", "E", "F"]);
    let foreign = bigger.find("F").unwrap();
    assert!(session.atlas().feature(foreign).is_none());

    assert!(!session.highlight(foreign));
    assert_eq!(session.highlighter().current(), None);
    assert!(session.styles().iter().all(|s| s.altitude != 0.08));
}
