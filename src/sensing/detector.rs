use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One accelerometer reading. Samples are consumed for magnitude computation
/// and never retained.
#[derive(Debug, Clone, Copy)]
pub struct AccelSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Monotonic capture time. The debounce math assumes timestamps are
    /// non-decreasing; anything else is clamped, never a panic.
    pub at: Instant,
}

impl AccelSample {
    pub fn new(x: f32, y: f32, z: f32, at: Instant) -> Self {
        Self { x, y, z, at }
    }

    /// Total acceleration magnitude (Euclidean norm of the three axes).
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Last known position of the device, attached to a fall event so responders
/// know where to go. Acquisition is the host's concern; the detector never
/// reads location hardware.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// When the position fix was taken; may predate the fall.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

/// A confirmed fall episode, emitted once the acceleration magnitude has
/// stayed below threshold for the full debounce window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallEvent {
    pub id: String,
    pub detected_at: DateTime<Utc>,
    /// Magnitude (m/s²) of the sample that confirmed the fall.
    pub acceleration: f32,
    /// How long the magnitude had been below threshold when the event fired.
    pub duration_ms: u64,
    /// Last known device position, if the host supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
}

impl FallEvent {
    pub fn new(acceleration: f32, below_threshold_for: Duration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            detected_at: Utc::now(),
            acceleration,
            duration_ms: below_threshold_for.as_millis() as u64,
            location: None,
        }
    }

    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Magnitudes strictly below this (m/s²) count as free fall. Gravity at
    /// rest reads ~9.8, so 2.0 means the device is close to weightless.
    pub free_fall_threshold: f32,
    /// Minimum continuous time below threshold before a fall is confirmed.
    pub min_free_fall: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            free_fall_threshold: 2.0,
            min_free_fall: Duration::from_millis(50),
        }
    }
}

/// Debounced free-fall detector.
///
/// Emits at most one [`FallEvent`] per contiguous sub-threshold run; the
/// magnitude must return to or above threshold before a new episode can be
/// reported.
#[derive(Debug)]
pub struct FallDetector {
    config: DetectorConfig,
    fall_started: Option<Instant>,
    event_emitted: bool,
}

impl FallDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            config,
            fall_started: None,
            event_emitted: false,
        }
    }

    /// Feed one sample through the detector.
    pub fn process(&mut self, sample: &AccelSample) -> Option<FallEvent> {
        let magnitude = sample.magnitude();

        // A NaN axis poisons the magnitude; treat it as a reading we cannot
        // trust and re-arm rather than comparing garbage against thresholds.
        if !magnitude.is_finite() {
            self.rearm();
            return None;
        }

        if magnitude < self.config.free_fall_threshold {
            let started = *self.fall_started.get_or_insert(sample.at);
            // Clamps to zero if the caller hands us an out-of-order timestamp.
            let elapsed = sample.at.saturating_duration_since(started);

            if elapsed >= self.config.min_free_fall && !self.event_emitted {
                self.event_emitted = true;
                return Some(FallEvent::new(magnitude, elapsed));
            }
            None
        } else {
            self.rearm();
            None
        }
    }

    fn rearm(&mut self) {
        self.fall_started = None;
        self.event_emitted = false;
    }
}

impl Default for FallDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(magnitude: f32, base: Instant, offset_ms: u64) -> AccelSample {
        // Put the whole magnitude on one axis for simplicity.
        AccelSample::new(magnitude, 0.0, 0.0, base + Duration::from_millis(offset_ms))
    }

    /// Runs magnitudes spaced `step_ms` apart, returning sample indices that
    /// produced an event.
    fn run(detector: &mut FallDetector, magnitudes: &[f32], step_ms: u64) -> Vec<usize> {
        let base = Instant::now();
        magnitudes
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| {
                detector
                    .process(&sample(m, base, i as u64 * step_ms))
                    .map(|_| i)
            })
            .collect()
    }

    #[test]
    fn magnitude_is_euclidean_norm() {
        let s = AccelSample::new(3.0, 4.0, 0.0, Instant::now());
        assert!((s.magnitude() - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn sustained_free_fall_fires_exactly_once() {
        let mut detector = FallDetector::new();
        // 20 ms cadence: sub-threshold run starts at index 1, elapsed reaches
        // 60 ms (>= 50 ms) on the fourth consecutive sub-threshold sample.
        let fired = run(
            &mut detector,
            &[9.8, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            20,
        );
        assert_eq!(fired, vec![4]);
    }

    #[test]
    fn short_dip_below_threshold_does_not_fire() {
        let mut detector = FallDetector::new();
        // Only three sub-threshold samples at 20 ms spacing: elapsed peaks at
        // 40 ms, under the 50 ms debounce.
        let fired = run(&mut detector, &[9.8, 1.0, 1.0, 1.0, 9.8], 20);
        assert!(fired.is_empty());
    }

    #[test]
    fn recovery_above_threshold_rearms_for_a_second_episode() {
        let mut detector = FallDetector::new();
        let fired = run(
            &mut detector,
            &[1.0, 1.0, 1.0, 1.0, 9.8, 1.0, 1.0, 1.0, 1.0],
            20,
        );
        // One event per sub-threshold run, fresh timing for the second run.
        assert_eq!(fired, vec![3, 8]);
    }

    #[test]
    fn rise_before_debounce_resets_the_window() {
        let mut detector = FallDetector::new();
        // Neither dip lasts the full debounce; the second dip must not
        // inherit timing from the first.
        let fired = run(&mut detector, &[1.0, 1.0, 9.8, 1.0, 1.0, 9.8], 20);
        assert!(fired.is_empty());
    }

    #[test]
    fn threshold_comparison_is_strict() {
        let mut detector = FallDetector::with_config(DetectorConfig {
            free_fall_threshold: 2.0,
            min_free_fall: Duration::from_millis(50),
        });
        // Exactly at threshold never enters the fall window.
        let fired = run(&mut detector, &[2.0, 2.0, 2.0, 2.0, 2.0], 20);
        assert!(fired.is_empty());
    }

    #[test]
    fn event_carries_trigger_magnitude_and_elapsed() {
        let mut detector = FallDetector::new();
        let base = Instant::now();
        assert!(detector.process(&sample(0.5, base, 0)).is_none());
        let event = detector
            .process(&sample(1.5, base, 60))
            .expect("debounce satisfied");
        assert!((event.acceleration - 1.5).abs() < f32::EPSILON);
        assert_eq!(event.duration_ms, 60);
    }

    #[test]
    fn out_of_order_timestamp_clamps_instead_of_panicking() {
        let mut detector = FallDetector::new();
        let base = Instant::now();
        assert!(detector.process(&sample(1.0, base, 100)).is_none());
        // Earlier timestamp than fall start: elapsed clamps to zero.
        assert!(detector.process(&sample(1.0, base, 40)).is_none());
        // Monotonic again; debounce measured from the original fall start.
        assert!(detector.process(&sample(1.0, base, 160)).is_some());
    }

    #[test]
    fn event_serializes_host_supplied_location() {
        let event = FallEvent::new(1.2, Duration::from_millis(60)).with_location(GeoLocation {
            latitude: 32.08,
            longitude: 34.78,
            accuracy: Some(12.5),
            provider: Some("gps".to_string()),
            recorded_at: None,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["location"]["latitude"], 32.08);
        assert_eq!(json["location"]["provider"], "gps");

        // Without a fix the field is omitted entirely.
        let bare = serde_json::to_value(FallEvent::new(1.2, Duration::from_millis(60))).unwrap();
        assert!(bare.get("location").is_none());
    }

    #[test]
    fn nan_reading_rearms_the_detector() {
        let mut detector = FallDetector::new();
        let base = Instant::now();
        assert!(detector.process(&sample(1.0, base, 0)).is_none());
        assert!(detector.process(&sample(f32::NAN, base, 20)).is_none());
        // The NaN broke the run; timing restarts here.
        assert!(detector.process(&sample(1.0, base, 40)).is_none());
        assert!(detector.process(&sample(1.0, base, 60)).is_none());
        assert!(detector.process(&sample(1.0, base, 100)).is_some());
    }
}
