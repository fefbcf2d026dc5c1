use async_trait::async_trait;
use worldpulse_client::{BatchResponse, Result, WorldPulseClient};
use worldpulse_common::{CountryKey, SentimentRecord};

/// The backend operations a run needs. Each call is a single attempt; the
/// orchestrator owns retries.
#[async_trait]
pub trait SentimentSource: Send + Sync {
    async fn countries(&self) -> Result<Vec<CountryKey>>;

    async fn sentiment_country(&self, topic: &str, country: &CountryKey) -> Result<SentimentRecord>;

    async fn sentiment_batch(
        &self,
        topic: &str,
        limit: usize,
        countries: Option<&[CountryKey]>,
    ) -> Result<BatchResponse>;
}

#[async_trait]
impl SentimentSource for WorldPulseClient {
    async fn countries(&self) -> Result<Vec<CountryKey>> {
        WorldPulseClient::countries(self).await
    }

    async fn sentiment_country(&self, topic: &str, country: &CountryKey) -> Result<SentimentRecord> {
        WorldPulseClient::sentiment_country(self, topic, country).await
    }

    async fn sentiment_batch(
        &self,
        topic: &str,
        limit: usize,
        countries: Option<&[CountryKey]>,
    ) -> Result<BatchResponse> {
        WorldPulseClient::sentiment_batch(self, topic, limit, countries).await
    }
}
