use serde::Serialize;
use tokio::sync::broadcast;

use crate::sensing::FallEvent;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Why an escalation ended without a call.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CancelReason {
    /// The user tapped the explicit "I'm OK" action.
    Acknowledged,
    /// The user swiped the alert away. Treated the same as an ack.
    Dismissed,
}

/// Observable escalation lifecycle, published on every transition so hosts
/// can persist fall events or mirror the countdown elsewhere.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EscalationEvent {
    FallDetected { episode: FallEvent },
    CountdownTick { remaining_ms: i64 },
    EscalationCancelled { reason: CancelReason },
    CallPlaced { number: String, label: String },
}

/// Lossy broadcast of [`EscalationEvent`]s. Publishing never blocks and
/// succeeds with or without subscribers; slow subscribers drop events rather
/// than stalling a state transition.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EscalationEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EscalationEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, event: EscalationEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
