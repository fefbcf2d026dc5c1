pub mod error;
pub mod retry;
pub mod types;
pub mod world;

pub use error::{FetchError, Result};
pub use retry::{fetch_with_retries, RetryPolicy};
pub use types::{BatchResponse, CountriesResponse, SentimentPayload};
pub use world::WorldLoader;

use std::time::Duration;

use serde::de::DeserializeOwned;
use worldpulse_common::{CountryKey, SentimentRecord};

/// Single-attempt client for the WorldPulse backend. Callers wrap calls in
/// [`fetch_with_retries`] for resilience.
#[derive(Clone)]
pub struct WorldPulseClient {
    client: reqwest::Client,
    base_url: String,
}

impl WorldPulseClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Like [`WorldPulseClient::new`] with an optional per-request timeout.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Canonical country keys the backend can analyse, in backend order.
    pub async fn countries(&self) -> Result<Vec<CountryKey>> {
        let resp: CountriesResponse = self.get_json("/countries", &[]).await?;
        Ok(resp.countries.into_iter().map(CountryKey::new).collect())
    }

    /// Sentiment for one country on one topic.
    pub async fn sentiment_country(&self, topic: &str, country: &CountryKey) -> Result<SentimentRecord> {
        let query = [
            ("topic", topic.to_string()),
            ("country", country.to_string()),
        ];
        let payload: SentimentPayload = self.get_json("/sentiment_country", &query).await?;
        tracing::debug!(country = %country, score = payload.sentiment_score, "Fetched country sentiment");
        payload.into_record()
    }

    /// Many countries in one call. `countries` narrows the set before `limit`
    /// is applied by the backend.
    pub async fn sentiment_batch(
        &self,
        topic: &str,
        limit: usize,
        countries: Option<&[CountryKey]>,
    ) -> Result<BatchResponse> {
        let mut query = vec![("topic", topic.to_string()), ("limit", limit.to_string())];
        if let Some(countries) = countries.filter(|c| !c.is_empty()) {
            let csv = countries
                .iter()
                .map(CountryKey::as_str)
                .collect::<Vec<_>>()
                .join(",");
            query.push(("countries", csv));
        }

        let resp: BatchResponse = self.get_json("/sentiment", &query).await?;
        tracing::info!(topic, results = resp.results.len(), "Fetched batch sentiment");
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).query(query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
