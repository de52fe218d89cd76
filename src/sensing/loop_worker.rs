use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::escalation::EscalationController;

use super::detector::{AccelSample, DetectorConfig, FallDetector};

/// Consumes accelerometer samples until the channel closes or the token is
/// cancelled, forwarding confirmed falls to the escalation controller.
pub async fn detection_loop(
    mut samples: mpsc::Receiver<AccelSample>,
    escalation: EscalationController,
    config: DetectorConfig,
    cancel_token: CancellationToken,
) {
    let mut detector = FallDetector::with_config(config);

    loop {
        tokio::select! {
            maybe_sample = samples.recv() => {
                let Some(sample) = maybe_sample else {
                    info!("sample source closed; detection loop exiting");
                    break;
                };

                if let Some(event) = detector.process(&sample) {
                    warn!(
                        "free fall detected: {:.2} m/s² sustained for {}ms",
                        event.acceleration, event.duration_ms
                    );
                    if let Err(err) = escalation.on_fall_detected(event).await {
                        error!("failed to start escalation: {err:?}");
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                info!("detection loop shutting down");
                break;
            }
        }
    }
}
