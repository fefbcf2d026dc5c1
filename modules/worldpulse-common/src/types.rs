use std::fmt;

use serde::{Deserialize, Serialize};

use crate::band::SentimentBand;

// --- Country naming ---

/// Canonical short identifier the backend uses for a country, e.g. `"USA"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryKey(String);

impl CountryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CountryKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CountryKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Country name as emitted by the map geometry source. Not guaranteed unique
/// or stable; resolve it to a [`CountryKey`] before touching results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeometryLabel(String);

impl GeometryLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeometryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GeometryLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

// --- Runs ---

/// Identifies one topic-analysis run. Strictly increasing within a process.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RunEpoch(pub u64);

impl RunEpoch {
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for RunEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch#{}", self.0)
    }
}

// --- Results ---

/// One country's sentiment on one topic, as accepted from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub country_key: CountryKey,
    pub topic: String,
    /// Always within `[-1.0, 1.0]`.
    pub score: f64,
    pub summary: String,
    pub keywords: Vec<String>,
}

impl SentimentRecord {
    pub fn band(&self) -> SentimentBand {
        SentimentBand::from_score(Some(self.score))
    }
}
