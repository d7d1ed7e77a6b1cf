// Copyright 2026 Profilescope Contributors
// SPDX-License-Identifier: Apache-2.0

//! Acquisition event types and broadcast channel.
//!
//! The orchestrator emits `AcquisitionEvent`s as a run moves through its
//! states and tiers. They flow through a `tokio::sync::broadcast` channel to
//! any subscribers (CLI progress, audit tooling). With no subscriber, events
//! are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::SourceTier;

/// States of one acquisition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcquisitionState {
    Resolving,
    Fetching,
    Extracting,
    Done,
    Failed,
}

impl std::fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolving => write!(f, "RESOLVING"),
            Self::Fetching => write!(f, "FETCHING"),
            Self::Extracting => write!(f, "EXTRACTING"),
            Self::Done => write!(f, "DONE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// An event emitted during one acquisition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionEvent {
    /// Identifies the run this event belongs to.
    pub run_id: String,
    pub company: String,
    /// Monotonically increasing within a run.
    pub seq: u64,
    pub event: AcquisitionEventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AcquisitionEventKind {
    StateChanged { state: AcquisitionState },
    TierStarted { tier: SourceTier },
    TierFailed { tier: SourceTier, error: String, elapsed_ms: u64 },
    TierCompleted { tier: SourceTier, chars: usize, elapsed_ms: u64 },
}

pub type EventSender = tokio::sync::broadcast::Sender<AcquisitionEvent>;
pub type EventReceiver = tokio::sync::broadcast::Receiver<AcquisitionEvent>;

/// Create an event channel. 64 slots covers several concurrent runs.
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(64)
}

/// Per-run emitter carrying the run id and sequence counter.
///
/// Clones share the counter, so a run handed to another task keeps one
/// sequence.
#[derive(Clone)]
pub struct EventEmitter {
    tx: Option<EventSender>,
    run_id: String,
    company: String,
    seq: Arc<AtomicU64>,
}

impl EventEmitter {
    pub fn new(tx: Option<EventSender>, company: &str) -> Self {
        Self {
            tx,
            run_id: uuid::Uuid::new_v4().to_string(),
            company: company.to_string(),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Send `event`, ignoring the error raised when nobody listens.
    pub fn emit(&mut self, event: AcquisitionEventKind) {
        if let Some(ref sender) = self.tx {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
            let _ = sender.send(AcquisitionEvent {
                run_id: self.run_id.clone(),
                company: self.company.clone(),
                seq,
                event,
            });
        }
    }

    pub fn state(&mut self, state: AcquisitionState) {
        self.emit(AcquisitionEventKind::StateChanged { state });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = AcquisitionEvent {
            run_id: "r-1".to_string(),
            company: "Acme".to_string(),
            seq: 1,
            event: AcquisitionEventKind::TierFailed {
                tier: SourceTier::Primary,
                error: "Session creation failed: no chromium".to_string(),
                elapsed_ms: 12,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"TierFailed\""));
        assert!(json.contains("\"tier\":\"PRIMARY\""));
    }

    #[tokio::test]
    async fn test_emitter_sequences_events() {
        let (tx, mut rx) = channel();
        let mut emitter = EventEmitter::new(Some(tx), "Acme");
        emitter.state(AcquisitionState::Resolving);
        let mut handed_off = emitter.clone();
        handed_off.emit(AcquisitionEventKind::TierStarted {
            tier: SourceTier::Primary,
        });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!((first.seq, second.seq), (1, 2));
        assert_eq!(first.run_id, emitter.run_id());
        assert!(matches!(
            first.event,
            AcquisitionEventKind::StateChanged {
                state: AcquisitionState::Resolving
            }
        ));
    }

    #[test]
    fn test_emit_without_receivers() {
        let (tx, rx) = channel();
        drop(rx);
        let mut emitter = EventEmitter::new(Some(tx), "Acme");
        emitter.state(AcquisitionState::Done);

        let mut silent = EventEmitter::new(None, "Acme");
        silent.state(AcquisitionState::Failed);
    }
}
