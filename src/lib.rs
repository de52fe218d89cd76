//! Free-fall detection and emergency-call escalation.
//!
//! The crate watches a stream of accelerometer samples for a sustained
//! low-acceleration window (a free fall), then runs a cancellable countdown:
//! the user is alerted and, unless they acknowledge within the configured
//! delay, an automatic call is placed to the resolved emergency contact.
//!
//! Platform concerns (sensor acquisition, notification rendering, dialing)
//! stay outside the crate behind the [`AlertSink`] and [`CallDispatcher`]
//! traits; the host pushes samples into an mpsc channel and wires user taps
//! back into the [`EscalationController`].

pub mod alert;
pub mod call;
pub mod config;
pub mod escalation;
pub mod events;
pub mod sensing;
pub mod utils;

pub use alert::{AlertSink, FallAlert};
pub use call::CallDispatcher;
pub use config::{ContactStore, ResolvedTarget, DEFAULT_EMERGENCY_NUMBER};
pub use escalation::{
    EscalationConfig, EscalationController, EscalationSnapshot, EscalationState, EscalationStatus,
};
pub use events::{CancelReason, EscalationEvent, EventBus};
pub use sensing::{
    AccelSample, DetectorConfig, FallDetector, FallEvent, GeoLocation, MonitorController,
};
