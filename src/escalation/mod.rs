pub mod controller;
pub mod state;

pub use controller::{EscalationConfig, EscalationController, EscalationSnapshot};
pub use state::{EscalationState, EscalationStatus};
