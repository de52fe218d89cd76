use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle, time};

use crate::{
    alert::{AlertSink, FallAlert},
    call::CallDispatcher,
    config::ContactStore,
    events::{CancelReason, EscalationEvent, EventBus},
    sensing::FallEvent,
    utils::format_countdown,
};

use super::state::{EscalationState, EscalationStatus};

#[derive(Debug, Clone, Copy)]
pub struct EscalationConfig {
    /// How long the user has to acknowledge before the call is placed.
    pub auto_call_delay: Duration,
    /// Cadence of countdown refreshes pushed to the alert sink.
    pub tick_interval: Duration,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            auto_call_delay: Duration::from_secs(120),
            tick_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct EscalationSnapshot {
    pub state: EscalationState,
    pub remaining_ms: i64,
}

/// Drives the fall-to-call escalation protocol.
///
/// All transitions serialize on one state mutex, so the race between a late
/// acknowledgment and the expiry firing resolves to whichever acquires the
/// lock first; the loser sees a state it no longer owns and becomes a no-op.
/// The expiry and ticker tasks are owned handles: at most one of each exists,
/// and starting a new episode aborts and replaces them.
#[derive(Clone)]
pub struct EscalationController {
    state: Arc<Mutex<EscalationState>>,
    contacts: Arc<ContactStore>,
    alerts: Arc<dyn AlertSink>,
    calls: Arc<dyn CallDispatcher>,
    events: EventBus,
    expiry: Arc<Mutex<Option<JoinHandle<()>>>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    config: EscalationConfig,
}

impl EscalationController {
    pub fn new(
        contacts: Arc<ContactStore>,
        alerts: Arc<dyn AlertSink>,
        calls: Arc<dyn CallDispatcher>,
    ) -> Self {
        Self::with_config(contacts, alerts, calls, EscalationConfig::default())
    }

    pub fn with_config(
        contacts: Arc<ContactStore>,
        alerts: Arc<dyn AlertSink>,
        calls: Arc<dyn CallDispatcher>,
        config: EscalationConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(EscalationState::new())),
            contacts,
            alerts,
            calls,
            events: EventBus::new(),
            expiry: Arc::new(Mutex::new(None)),
            ticker: Arc::new(Mutex::new(None)),
            config,
        }
    }

    pub async fn get_state(&self) -> EscalationState {
        self.state.lock().await.clone()
    }

    pub async fn get_snapshot(&self) -> EscalationSnapshot {
        let guard = self.state.lock().await;
        EscalationSnapshot {
            remaining_ms: guard.remaining_ms(),
            state: guard.clone(),
        }
    }

    /// Stream of escalation lifecycle events, for hosts that persist fall
    /// episodes or mirror the countdown elsewhere.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EscalationEvent> {
        self.events.subscribe()
    }

    /// A confirmed fall: start (or restart) the countdown to the automatic
    /// call and show the initial alert.
    ///
    /// A fall arriving while a countdown is already running supersedes it:
    /// the previous expiry and ticker are fully cancelled before the new
    /// countdown starts, so there is never more than one pending call.
    pub async fn on_fall_detected(&self, event: FallEvent) -> Result<()> {
        self.cancel_expiry().await;
        self.cancel_ticker().await;

        let episode_id = event.id.clone();
        let alert = {
            let mut state = self.state.lock().await;
            if state.status == EscalationStatus::Alerting {
                warn!("fall detected mid-countdown; superseding the running escalation");
            }
            state.begin_alert(
                event.clone(),
                self.config.auto_call_delay.as_millis() as u64,
                Utc::now(),
                Instant::now(),
            );
            self.build_alert(&state)
        };

        info!(
            "escalation started for episode {}: calling {} in {}",
            episode_id,
            alert.as_ref().map_or("?", |a| a.target_label.as_str()),
            format_countdown(self.config.auto_call_delay.as_millis() as i64),
        );

        if let Some(alert) = alert {
            if let Err(err) = self.alerts.render(&alert) {
                error!("failed to render fall alert: {err:?}");
            }
        }

        self.events
            .publish(EscalationEvent::FallDetected { episode: event });

        self.spawn_expiry(episode_id.clone()).await;
        self.spawn_ticker(episode_id).await;
        Ok(())
    }

    /// The user tapped "I'm OK": cancel the pending call and clear the alert.
    /// A no-op unless a countdown is running, so duplicate or late taps are
    /// harmless.
    pub async fn on_user_ack(&self) -> Result<()> {
        self.cancel_escalation(CancelReason::Acknowledged).await
    }

    /// The user swiped the alert away. Treated exactly like an ack: the
    /// pending call is cancelled.
    pub async fn on_user_dismiss(&self) -> Result<()> {
        self.cancel_escalation(CancelReason::Dismissed).await
    }

    /// Countdown refresh for the given episode. Recomputes the remaining
    /// time and pushes it to the alert sink; once the deadline has passed the
    /// terminal tick renders nothing and leaves the rest to expiry.
    pub async fn on_tick(&self, episode_id: &str) -> Result<()> {
        let alert = {
            let state = self.state.lock().await;
            if !state.is_alerting_episode(episode_id) {
                return Ok(());
            }
            if state.remaining_ms() <= 0 {
                return Ok(());
            }
            self.build_alert(&state)
        };

        let Some(alert) = alert else {
            return Ok(());
        };

        if let Err(err) = self.alerts.update(&alert) {
            error!("failed to update countdown alert: {err:?}");
        }

        self.events.publish(EscalationEvent::CountdownTick {
            remaining_ms: alert.remaining_ms,
        });
        Ok(())
    }

    /// The countdown elapsed with no acknowledgment: resolve the target from
    /// the configuration as it stands *now* and place the call.
    ///
    /// A no-op unless the named episode is still alerting, which rules out a
    /// double call when a cancellation or supersession was serialized first.
    /// A failed call placement still ends the escalation; the protocol's job
    /// is to attempt the call once, not to guarantee delivery.
    pub async fn on_timer_expired(&self, episode_id: &str) -> Result<()> {
        let target = {
            let mut state = self.state.lock().await;
            if !state.is_alerting_episode(episode_id) {
                return Ok(());
            }
            state.resolve();
            self.contacts.resolve_target()
        };

        warn!(
            "auto-call timer expired for episode {episode_id}; calling {} ({})",
            target.number, target.label
        );

        // No await between committing `Resolved` and dispatching: this method
        // runs on the expiry task, and a superseding fall aborts that task at
        // its next await point. The call and the alert teardown must already
        // be done by then.
        self.alerts.clear();
        let call_result = self.calls.place_call(&target.number);

        match &call_result {
            Ok(()) => self.events.publish(EscalationEvent::CallPlaced {
                number: target.number,
                label: target.label,
            }),
            Err(err) => error!(
                "call placement to {} failed; not retrying: {err:?}",
                target.number
            ),
        }

        self.cancel_ticker().await;
        // The expiry task is the caller here; dropping its handle detaches
        // rather than aborts.
        self.expiry.lock().await.take();

        {
            let mut state = self.state.lock().await;
            // Only clear our own resolved episode; a new fall may already
            // have superseded it.
            if state.status == EscalationStatus::Resolved
                && state
                    .episode
                    .as_ref()
                    .is_some_and(|episode| episode.id == episode_id)
            {
                state.clear();
            }
        }

        call_result
    }

    async fn cancel_escalation(&self, reason: CancelReason) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.status != EscalationStatus::Alerting {
                return Ok(());
            }
            state.clear();
        }

        self.cancel_expiry().await;
        self.cancel_ticker().await;

        info!("escalation cancelled ({reason:?}); no call will be placed");

        self.alerts.clear();
        self.events
            .publish(EscalationEvent::EscalationCancelled { reason });
        Ok(())
    }

    async fn spawn_expiry(&self, episode_id: String) {
        let mut expiry_guard = self.expiry.lock().await;
        if let Some(handle) = expiry_guard.take() {
            handle.abort();
        }

        let controller = self.clone();
        let delay = self.config.auto_call_delay;

        *expiry_guard = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            if let Err(err) = controller.on_timer_expired(&episode_id).await {
                error!("automatic emergency call failed: {err:?}");
            }
        }));
    }

    async fn spawn_ticker(&self, episode_id: String) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let controller = self.clone();
        let tick_interval = self.config.tick_interval;

        *ticker_guard = Some(tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            loop {
                interval.tick().await;

                let live = {
                    let state = controller.state.lock().await;
                    state.is_alerting_episode(&episode_id)
                };
                if !live {
                    break;
                }

                if let Err(err) = controller.on_tick(&episode_id).await {
                    error!("countdown tick failed: {err:?}");
                }
            }
        }));
    }

    async fn cancel_expiry(&self) {
        if let Some(handle) = self.expiry.lock().await.take() {
            handle.abort();
        }
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    /// Builds the alert payload for the current state; `None` outside of
    /// `Alerting`.
    fn build_alert(&self, state: &EscalationState) -> Option<FallAlert> {
        let episode = state.episode.as_ref()?;
        if state.status != EscalationStatus::Alerting {
            return None;
        }

        let remaining_ms = state.remaining_ms();
        let target = self.contacts.resolve_target();
        Some(FallAlert {
            episode: episode.clone(),
            remaining_ms,
            countdown: format_countdown(remaining_ms),
            target_number: target.number,
            target_label: target.label,
        })
    }
}
