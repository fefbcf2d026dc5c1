//! Single-feature highlight with automatic expiry.
//!
//! `Idle` → `select` → `Highlighted(feature, deadline)` → deadline elapses →
//! `Idle`. A new `select` replaces both the feature and the pending expiry;
//! only one timer is ever live, and a superseded timer never clears a newer
//! highlight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use worldpulse_common::FeatureRef;

use crate::publisher::{PipelineEvent, RepaintPublisher};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HighlightState {
    #[default]
    Idle,
    Highlighted {
        feature: FeatureRef,
        deadline: Instant,
    },
}

#[derive(Default)]
struct Inner {
    state: HighlightState,
    /// Bumped on every transition; an expiry only applies to its own generation.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

/// Must be used from within a tokio runtime.
pub struct Highlighter {
    inner: Arc<Mutex<Inner>>,
    publisher: Arc<dyn RepaintPublisher>,
}

impl Highlighter {
    pub fn new(publisher: Arc<dyn RepaintPublisher>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            publisher,
        }
    }

    pub fn select(&self, feature: FeatureRef, duration: Duration) {
        let deadline = Instant::now() + duration;
        {
            let mut inner = lock(&self.inner);
            inner.generation += 1;
            let generation = inner.generation;
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
            inner.state = HighlightState::Highlighted { feature, deadline };

            let shared = Arc::clone(&self.inner);
            let publisher = Arc::clone(&self.publisher);
            inner.timer = Some(tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                let expired = {
                    let mut inner = lock(&shared);
                    if inner.generation == generation {
                        inner.state = HighlightState::Idle;
                        inner.timer = None;
                        true
                    } else {
                        false
                    }
                };
                if expired {
                    publisher.publish(PipelineEvent::HighlightChanged { feature: None });
                }
            }));
        }
        self.publisher.publish(PipelineEvent::HighlightChanged {
            feature: Some(feature),
        });
    }

    /// Drop any highlight now and cancel its expiry.
    pub fn clear(&self) {
        let was_highlighted = {
            let mut inner = lock(&self.inner);
            inner.generation += 1;
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
            std::mem::take(&mut inner.state) != HighlightState::Idle
        };
        if was_highlighted {
            self.publisher
                .publish(PipelineEvent::HighlightChanged { feature: None });
        }
    }

    pub fn state(&self) -> HighlightState {
        lock(&self.inner).state
    }

    pub fn current(&self) -> Option<FeatureRef> {
        match self.state() {
            HighlightState::Highlighted { feature, .. } => Some(feature),
            HighlightState::Idle => None,
        }
    }
}

impl Drop for Highlighter {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.inner).timer.take() {
            timer.abort();
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
