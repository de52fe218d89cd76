use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::escalation::EscalationController;

use super::detector::{AccelSample, DetectorConfig};
use super::loop_worker::detection_loop;

/// Owns the background detection task: at most one loop runs at a time, and
/// stopping cancels then joins it.
pub struct MonitorController {
    config: DetectorConfig,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl MonitorController {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            config,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start(
        &mut self,
        samples: mpsc::Receiver<AccelSample>,
        escalation: EscalationController,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("fall monitoring already active");
        }

        info!(
            "starting fall monitoring (threshold {:.1} m/s², debounce {}ms)",
            self.config.free_fall_threshold,
            self.config.min_free_fall.as_millis()
        );

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let handle = tokio::spawn(detection_loop(samples, escalation, self.config, token_clone));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("detection loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for MonitorController {
    fn default() -> Self {
        Self::new()
    }
}
