//! Latest accepted record per country, guarded by the run epoch.
//!
//! Topic changes can outpace the network. Every write names the epoch it was
//! issued under, and only writes for the current epoch land; a slow response
//! from a superseded topic is dropped instead of overwriting fresh data.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use worldpulse_common::{CountryKey, RunEpoch, SentimentRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Accepted,
    /// Issued under an epoch that is no longer current. Not an error.
    Stale { current: RunEpoch },
}

#[derive(Debug, Default)]
struct IndexState {
    epoch: RunEpoch,
    records: HashMap<CountryKey, SentimentRecord>,
}

/// The lock is never held across an `.await`.
#[derive(Debug, Default)]
pub struct ResultIndex {
    state: Mutex<IndexState>,
}

impl ResultIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run: advance the epoch and drop every record from earlier
    /// runs. In-flight work tagged with an older epoch becomes stale.
    pub fn begin_run(&self) -> RunEpoch {
        let mut state = self.lock();
        state.epoch = state.epoch.next();
        state.records.clear();
        state.epoch
    }

    pub fn current_epoch(&self) -> RunEpoch {
        self.lock().epoch
    }

    /// Insert or overwrite `record` if `epoch` is current. Last write wins.
    pub fn accept(&self, epoch: RunEpoch, record: SentimentRecord) -> Acceptance {
        let mut state = self.lock();
        if epoch != state.epoch {
            return Acceptance::Stale {
                current: state.epoch,
            };
        }
        state.records.insert(record.country_key.clone(), record);
        Acceptance::Accepted
    }

    /// Clear every record. Also advances the epoch so work issued before the
    /// reset cannot repopulate the index.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.epoch = state.epoch.next();
        state.records.clear();
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        let state = self.lock();
        IndexSnapshot {
            epoch: state.epoch,
            records: state
                .records
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read-only copy of the index at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSnapshot {
    pub epoch: RunEpoch,
    records: BTreeMap<CountryKey, SentimentRecord>,
}

impl IndexSnapshot {
    pub fn get(&self, key: &CountryKey) -> Option<&SentimentRecord> {
        self.records.get(key)
    }

    pub fn score(&self, key: &CountryKey) -> Option<f64> {
        self.records.get(key).map(|r| r.score)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records ordered by country key.
    pub fn iter(&self) -> impl Iterator<Item = &SentimentRecord> {
        self.records.values()
    }
}
