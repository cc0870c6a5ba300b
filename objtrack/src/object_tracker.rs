//! Individual name-keyed object tracker using a constant-velocity Kalman filter

use crate::kalman::{KalmanFilter, KalmanFilterParams};
use crate::measurement::{Measurement, ObjectSnapshot};
use anyhow::Result;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Tuning knobs shared by every tracker in a registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    /// Multiplier on the identity measurement noise covariance R
    pub measurement_noise_scale: f32,
    /// Multiplier on the identity initial state covariance P
    pub initial_uncertainty_scale: f32,
    /// Multiplier on the identity process noise covariance Q
    pub process_noise_scale: f32,
    /// Time without a measurement after which the tracker is evicted
    #[serde(with = "millis")]
    pub max_age: Duration,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            measurement_noise_scale: 2.0,
            initial_uncertainty_scale: 1000.0,
            process_noise_scale: 0.01,
            max_age: Duration::from_millis(800),
        }
    }
}

impl TrackerParams {
    fn filter_params(&self) -> KalmanFilterParams {
        KalmanFilterParams::scaled_identity(
            self.measurement_noise_scale,
            self.initial_uncertainty_scale,
            self.process_noise_scale,
        )
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone)]
pub struct ObjectTracker {
    /// identity key, fixed at creation
    name: String,
    /// Kalman filter tracking the object center
    kf: KalmanFilter,
    /// most recently observed (width, height), unfiltered
    last_size: (f32, f32),
    /// when the last measurement arrived
    last_update: Instant,
    max_age: Duration,
    /// number of measurements consumed
    hits: u32,
    /// number of predict() steps survived
    age: u32,
}

impl ObjectTracker {
    /// Create a tracker from its first measurement.
    ///
    /// The filter starts from a zero state with a large covariance and the
    /// measurement is applied as an ordinary correction step.
    pub fn new(measurement: &Measurement, params: &TrackerParams, now: Instant) -> Self {
        let mut tracker = Self {
            name: measurement.name.clone(),
            kf: KalmanFilter::new(params.filter_params()),
            last_size: measurement.size(),
            last_update: now,
            max_age: params.max_age,
            hits: 0,
            age: 0,
        };
        if let Err(e) = tracker.update(measurement, now) {
            log::warn!("{}: initial correction failed ({}), seeding position", tracker.name, e);
            tracker.kf.x[0] = measurement.center_x;
            tracker.kf.x[1] = measurement.center_y;
        }
        tracker
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn last_size(&self) -> (f32, f32) {
        self.last_size
    }

    pub fn last_update(&self) -> Instant {
        self.last_update
    }

    /// Feed a measurement into the correction step.
    ///
    /// Size and timestamp are refreshed even when the filter rejects the
    /// position, so a numerically troubled tracker still reports current size.
    pub fn update(&mut self, measurement: &Measurement, now: Instant) -> Result<()> {
        self.last_size = measurement.size();
        self.last_update = now;
        self.hits += 1;

        let [x, y] = measurement.position();
        self.kf.update(Vector2::new(x, y))
    }

    /// True once no measurement arrived for longer than `max_age`
    pub fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_update) > self.max_age
    }

    /// Advance one step and emit a snapshot, or `None` when stale.
    ///
    /// A `None` result means the tracker is evicted; the owner must drop it.
    pub fn predict(&mut self, now: Instant) -> Option<ObjectSnapshot> {
        if self.is_stale(now) {
            log::debug!(
                "{} went stale after {} hits over {} cycles",
                self.name,
                self.hits,
                self.age
            );
            return None;
        }
        self.kf.predict();
        self.age += 1;
        Some(self.snapshot())
    }

    /// Current filtered position with the last reported size
    pub fn snapshot(&self) -> ObjectSnapshot {
        let (x, y) = self.kf.position();
        ObjectSnapshot {
            name: self.name.clone(),
            x,
            y,
            width: self.last_size.0,
            height: self.last_size.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cup(x: f32, y: f32, w: f32, h: f32) -> Measurement {
        Measurement::new("cup", x, y, w, h)
    }

    #[test]
    fn test_new_tracker_reports_measurement() {
        let t0 = Instant::now();
        let mut tracker = ObjectTracker::new(&cup(0.5, 0.5, 0.1, 0.1), &TrackerParams::default(), t0);

        let snap = tracker.predict(t0).unwrap();
        assert_eq!(snap.name, "cup");
        assert_abs_diff_eq!(snap.x, 0.5, epsilon = 0.01);
        assert_abs_diff_eq!(snap.y, 0.5, epsilon = 0.01);
        assert_abs_diff_eq!(snap.width, 0.1, epsilon = 1e-6);
        assert_eq!(tracker.hits, 1);
        assert_eq!(tracker.age, 1);
    }

    #[test]
    fn test_size_is_not_filtered() {
        let t0 = Instant::now();
        let params = TrackerParams::default();
        let mut tracker = ObjectTracker::new(&cup(0.2, 0.2, 0.1, 0.1), &params, t0);
        tracker.predict(t0).unwrap();

        tracker.update(&cup(0.6, 0.6, 0.2, 0.2), t0).unwrap();
        let snap = tracker.snapshot();

        assert_abs_diff_eq!(snap.width, 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(snap.height, 0.2, epsilon = 1e-6);
        // corrected position moves toward the measurement by the gain
        assert!(snap.x > 0.2 && snap.x < 0.6, "x = {}", snap.x);
        assert!(snap.y > 0.2 && snap.y < 0.6, "y = {}", snap.y);
    }

    #[test]
    fn test_staleness_threshold() {
        let t0 = Instant::now();
        let mut tracker = ObjectTracker::new(&cup(0.5, 0.5, 0.1, 0.1), &TrackerParams::default(), t0);

        assert!(tracker.predict(t0 + Duration::from_millis(800)).is_some());
        assert!(tracker.predict(t0 + Duration::from_millis(801)).is_none());
    }

    #[test]
    fn test_update_refreshes_timestamp() {
        let t0 = Instant::now();
        let mut tracker = ObjectTracker::new(&cup(0.5, 0.5, 0.1, 0.1), &TrackerParams::default(), t0);

        let t1 = t0 + Duration::from_millis(700);
        tracker.update(&cup(0.5, 0.5, 0.1, 0.1), t1).unwrap();

        assert!(!tracker.is_stale(t0 + Duration::from_millis(1400)));
        assert!(tracker.is_stale(t0 + Duration::from_millis(1600)));
    }

    #[test]
    fn test_params_from_json() {
        let params: TrackerParams = serde_json::from_str(r#"{"max_age": 500}"#).unwrap();
        assert_eq!(params.max_age, Duration::from_millis(500));
        assert_abs_diff_eq!(params.measurement_noise_scale, 2.0);
        assert_abs_diff_eq!(params.initial_uncertainty_scale, 1000.0);
        assert_abs_diff_eq!(params.process_noise_scale, 0.01);
    }
}
