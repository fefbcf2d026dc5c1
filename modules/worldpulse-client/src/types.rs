use serde::{Deserialize, Serialize};
use tracing::warn;
use worldpulse_common::{CountryKey, SentimentRecord};

use crate::error::{FetchError, Result};

/// Keyword the backend puts in a 200 response when its own AI call failed.
const BACKEND_FAILURE_KEYWORD: &str = "API_FAILURE";

#[derive(Debug, Clone, Deserialize)]
pub struct CountriesResponse {
    pub countries: Vec<String>,
}

/// Wire shape of one country's sentiment, shared by `/sentiment_country` and
/// the `results` of `/sentiment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentPayload {
    pub country: String,
    pub topic: String,
    pub sentiment_score: f64,
    pub summary: String,
    pub keywords: Vec<String>,
}

impl SentimentPayload {
    /// Validate and convert into a [`SentimentRecord`].
    ///
    /// Fails on an empty country, a non-finite score, or a backend-reported AI
    /// failure. Finite scores outside `[-1, 1]` are clamped.
    pub fn into_record(self) -> Result<SentimentRecord> {
        if self.country.trim().is_empty() {
            return Err(FetchError::Decode("response has an empty `country`".to_string()));
        }
        if self.keywords.iter().any(|k| k == BACKEND_FAILURE_KEYWORD) {
            return Err(FetchError::Upstream(self.summary));
        }
        if !self.sentiment_score.is_finite() {
            return Err(FetchError::Decode(format!(
                "non-finite sentiment_score for {}",
                self.country
            )));
        }

        let score = self.sentiment_score.clamp(-1.0, 1.0);
        if score != self.sentiment_score {
            warn!(
                country = %self.country,
                raw = self.sentiment_score,
                "sentiment_score out of range, clamped"
            );
        }

        Ok(SentimentRecord {
            country_key: CountryKey::new(self.country),
            topic: self.topic,
            score,
            summary: self.summary,
            keywords: self.keywords,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    pub topic: String,
    pub results: Vec<SentimentPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(score: f64, keywords: &[&str]) -> SentimentPayload {
        SentimentPayload {
            country: "Kenya".to_string(),
            topic: "water".to_string(),
            sentiment_score: score,
            summary: "Drought pressure easing.".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn converts_valid_payload() {
        let record = payload(-0.6, &["drought", "rain", "prices"])
            .into_record()
            .unwrap();
        assert_eq!(record.country_key, CountryKey::from("Kenya"));
        assert_eq!(record.score, -0.6);
        assert_eq!(record.keywords, vec!["drought", "rain", "prices"]);
    }

    #[test]
    fn backend_failure_sentinel_is_upstream_error() {
        let err = payload(0.0, &["API_FAILURE", "NO_DATA", "SYSTEM_ERROR"])
            .into_record()
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::Upstream("Drought pressure easing.".to_string())
        );
    }

    #[test]
    fn out_of_range_score_is_clamped() {
        assert_eq!(payload(1.7, &[]).into_record().unwrap().score, 1.0);
        assert_eq!(payload(-3.0, &[]).into_record().unwrap().score, -1.0);
    }

    #[test]
    fn non_finite_score_is_rejected() {
        let err = payload(f64::NAN, &[]).into_record().unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn missing_field_fails_to_deserialize() {
        let raw = r#"{"country":"USA","topic":"water","sentiment_score":0.1,"keywords":[]}"#;
        assert!(serde_json::from_str::<SentimentPayload>(raw).is_err());
    }

    #[test]
    fn string_score_fails_to_deserialize() {
        let raw = r#"{"country":"USA","topic":"water","sentiment_score":"0.1","summary":"","keywords":[]}"#;
        assert!(serde_json::from_str::<SentimentPayload>(raw).is_err());
    }
}
