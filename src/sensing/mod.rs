mod controller;
mod detector;
mod loop_worker;

pub use controller::MonitorController;
pub use detector::{AccelSample, DetectorConfig, FallDetector, FallEvent, GeoLocation};
pub use loop_worker::detection_loop;
