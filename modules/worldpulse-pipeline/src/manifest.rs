use serde::Serialize;
use worldpulse_common::{CountryKey, RunEpoch};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Fetched and written to the index.
    Accepted { score: f64 },
    /// Fetched, but a newer run had started; not written.
    Stale { score: f64 },
    Failed { error: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyOutcome {
    pub key: CountryKey,
    pub outcome: Outcome,
}

/// Per-key outcomes of one run, in settlement order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunManifest {
    pub epoch: RunEpoch,
    pub topic: String,
    pub outcomes: Vec<KeyOutcome>,
}

impl RunManifest {
    pub fn empty(epoch: RunEpoch, topic: impl Into<String>) -> Self {
        Self {
            epoch,
            topic: topic.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn outcome(&self, key: &CountryKey) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| &o.key == key)
            .map(|o| &o.outcome)
    }
}
