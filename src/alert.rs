use anyhow::Result;
use serde::Serialize;

use crate::sensing::FallEvent;

/// Everything the host needs to render or refresh the countdown alert.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallAlert {
    pub episode: FallEvent,
    pub remaining_ms: i64,
    /// Remaining time preformatted as "m:ss" for display.
    pub countdown: String,
    pub target_number: String,
    pub target_label: String,
}

/// Renders the countdown alert to the user and lets them answer it.
///
/// Implementations are platform notification surfaces; the controller treats
/// every call as fire-and-forget. A failed render is logged by the caller and
/// never alters escalation state. The two user actions a sink can surface —
/// acknowledge and dismiss — are reported back by invoking
/// [`EscalationController::on_user_ack`] and
/// [`EscalationController::on_user_dismiss`].
///
/// [`EscalationController::on_user_ack`]: crate::EscalationController::on_user_ack
/// [`EscalationController::on_user_dismiss`]: crate::EscalationController::on_user_dismiss
pub trait AlertSink: Send + Sync {
    /// Show the initial alert for a freshly detected fall.
    fn render(&self, alert: &FallAlert) -> Result<()>;

    /// Refresh the countdown text on an already-visible alert.
    fn update(&self, alert: &FallAlert) -> Result<()>;

    /// Remove the alert, whether because the user answered or the call was
    /// placed.
    fn clear(&self);
}
