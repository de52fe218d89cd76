use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp;
use std::time::Instant;

use crate::sensing::FallEvent;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EscalationStatus {
    /// No fall in flight; all signals are ignored except a new fall.
    Idle,
    /// Countdown running; ack/dismiss or expiry will end it.
    Alerting,
    /// Expiry won the race and the call is being placed.
    Resolved,
}

impl Default for EscalationStatus {
    fn default() -> Self {
        EscalationStatus::Idle
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationState {
    pub status: EscalationStatus,
    pub episode: Option<FallEvent>,
    pub alerting_since: Option<DateTime<Utc>>,
    pub auto_call_delay_ms: u64,
    /// Monotonic anchor for the countdown; wall-clock fields above are for
    /// display and serialization only.
    #[serde(skip)]
    pub alerting_anchor: Option<Instant>,
}

impl Default for EscalationState {
    fn default() -> Self {
        Self {
            status: EscalationStatus::Idle,
            episode: None,
            alerting_since: None,
            auto_call_delay_ms: 0,
            alerting_anchor: None,
        }
    }
}

impl EscalationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds until the automatic call, clamped at zero. Zero outside
    /// of `Alerting`.
    pub fn remaining_ms(&self) -> i64 {
        match (self.status, self.alerting_anchor) {
            (EscalationStatus::Alerting, Some(anchor)) => {
                let elapsed = anchor.elapsed().as_millis() as i64;
                cmp::max(self.auto_call_delay_ms as i64 - elapsed, 0)
            }
            _ => 0,
        }
    }

    /// True when `episode_id` names the episode currently alerting. Timer
    /// callbacks use this to drop firings that outlived their episode.
    pub fn is_alerting_episode(&self, episode_id: &str) -> bool {
        self.status == EscalationStatus::Alerting
            && self
                .episode
                .as_ref()
                .is_some_and(|episode| episode.id == episode_id)
    }

    pub fn begin_alert(
        &mut self,
        episode: FallEvent,
        auto_call_delay_ms: u64,
        started_at: DateTime<Utc>,
        now: Instant,
    ) {
        *self = Self {
            status: EscalationStatus::Alerting,
            episode: Some(episode),
            alerting_since: Some(started_at),
            auto_call_delay_ms,
            alerting_anchor: Some(now),
        };
    }

    /// Marks the countdown as won by expiry; the episode stays attached so
    /// the caller can report which fall triggered the call.
    pub fn resolve(&mut self) {
        self.status = EscalationStatus::Resolved;
        self.alerting_anchor = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
