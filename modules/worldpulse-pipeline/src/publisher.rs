//! Repaint notifications. The orchestrator and highlighter publish here after
//! every state change; renderers subscribe without touching fetch logic.

use tokio::sync::mpsc;
use tracing::debug;
use worldpulse_common::{CountryKey, FeatureRef, RunEpoch, SentimentRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A run began and the index was emptied.
    RunStarted {
        epoch: RunEpoch,
        topic: String,
        total: usize,
    },
    RecordAccepted {
        epoch: RunEpoch,
        record: SentimentRecord,
    },
    KeyFailed {
        epoch: RunEpoch,
        key: CountryKey,
        error: String,
    },
    RunCompleted {
        epoch: RunEpoch,
        succeeded: usize,
        failed: usize,
    },
    /// The run could not produce any results (batch call failed).
    RunFailed {
        epoch: RunEpoch,
        error: String,
    },
    /// Index and highlight were reset by the user.
    Cleared,
    HighlightChanged {
        feature: Option<FeatureRef>,
    },
}

pub trait RepaintPublisher: Send + Sync {
    fn publish(&self, event: PipelineEvent);
}

pub struct NoopPublisher;

impl RepaintPublisher for NoopPublisher {
    fn publish(&self, _event: PipelineEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RepaintPublisher for ChannelPublisher {
    fn publish(&self, event: PipelineEvent) {
        if self.tx.send(event).is_err() {
            debug!("Repaint subscriber dropped, event discarded");
        }
    }
}
