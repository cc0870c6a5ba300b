//! Registry owning one `ObjectTracker` per object name
//!
//! Each cycle runs the same sequence: apply the batch of measurements
//! (create or correct trackers by name), predict every tracker, drop the ones
//! that went stale and publish the survivors as a fresh snapshot list.

use crate::measurement::{Measurement, ObjectSnapshot};
use crate::object_tracker::{ObjectTracker, TrackerParams};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Immutable object list produced by one cycle
pub type Snapshot = Arc<Vec<ObjectSnapshot>>;

#[derive(Debug, Clone)]
pub struct TrackingRegistry {
    params: TrackerParams,
    trackers: BTreeMap<String, ObjectTracker>,
    snapshot: Snapshot,
    last_generation: Option<u64>,
    pub n_cycles: u64,
}

impl Default for TrackingRegistry {
    fn default() -> Self {
        Self::new(TrackerParams::default())
    }
}

impl TrackingRegistry {
    pub fn new(params: TrackerParams) -> Self {
        log::info!(
            "Creating TrackingRegistry: R x{}, P x{}, Q x{}, max_age={}ms",
            params.measurement_noise_scale,
            params.initial_uncertainty_scale,
            params.process_noise_scale,
            params.max_age.as_millis()
        );
        Self {
            params,
            trackers: BTreeMap::new(),
            snapshot: Arc::new(Vec::new()),
            last_generation: None,
            n_cycles: 0,
        }
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    /// Create or correct the tracker for every measurement, in order.
    ///
    /// When two measurements share a name the later one is applied last and
    /// its size wins.
    pub fn apply_measurements(&mut self, measurements: &[Measurement], now: Instant) {
        for m in measurements {
            if !m.is_valid() {
                log::debug!("Skipping invalid measurement {:?}", m);
                continue;
            }
            match self.trackers.get_mut(&m.name) {
                Some(tracker) => {
                    if let Err(e) = tracker.update(m, now) {
                        log::warn!("Tracker {} update failed ({}), restarting it", m.name, e);
                        self.trackers
                            .insert(m.name.clone(), ObjectTracker::new(m, &self.params, now));
                    }
                }
                None => {
                    log::debug!(
                        "New tracker {} at ({:.3}, {:.3})",
                        m.name,
                        m.center_x,
                        m.center_y
                    );
                    self.trackers
                        .insert(m.name.clone(), ObjectTracker::new(m, &self.params, now));
                }
            }
        }
    }

    /// Predict every tracker, evict the stale ones and publish the survivors
    pub fn predict_and_evict(&mut self, now: Instant) -> Snapshot {
        let predicted: Vec<(String, Option<ObjectSnapshot>)> = self
            .trackers
            .par_iter_mut()
            .map(|(name, tracker)| (name.clone(), tracker.predict(now)))
            .collect();

        let mut objects = Vec::with_capacity(predicted.len());
        for (name, snapshot) in predicted {
            match snapshot {
                Some(object) => objects.push(object),
                None => {
                    log::debug!("Evicting stale tracker {}", name);
                    self.trackers.remove(&name);
                }
            }
        }

        self.snapshot = Arc::new(objects);
        Arc::clone(&self.snapshot)
    }

    /// Run one full cycle stamped with the current time
    pub fn update_cycle(&mut self, measurements: &[Measurement]) -> Snapshot {
        self.update_cycle_at(measurements, Instant::now())
    }

    /// Run one full cycle at `now`; an empty batch is a pure aging pass
    pub fn update_cycle_at(&mut self, measurements: &[Measurement], now: Instant) -> Snapshot {
        self.apply_measurements(measurements, now);
        let snapshot = self.predict_and_evict(now);
        self.n_cycles += 1;
        log::trace!(
            "Cycle {}: {} measurements, {} live trackers",
            self.n_cycles,
            measurements.len(),
            snapshot.len()
        );
        snapshot
    }

    /// Recompute only when `generation` differs from the last synced one.
    ///
    /// `measure` is invoked lazily, so a redundant call within the same
    /// generation neither extracts measurements nor ages the trackers.
    pub fn sync<F>(&mut self, generation: u64, measure: F) -> Snapshot
    where
        F: FnOnce() -> Vec<Measurement>,
    {
        self.sync_at(generation, Instant::now(), measure)
    }

    pub fn sync_at<F>(&mut self, generation: u64, now: Instant, measure: F) -> Snapshot
    where
        F: FnOnce() -> Vec<Measurement>,
    {
        if self.last_generation == Some(generation) {
            return Arc::clone(&self.snapshot);
        }
        self.last_generation = Some(generation);
        let measurements = measure();
        self.update_cycle_at(&measurements, now)
    }

    /// Latest published object list
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.snapshot)
    }

    pub fn last_generation(&self) -> Option<u64> {
        self.last_generation
    }

    pub fn contains(&self, name: &str) -> bool {
        self.trackers.contains_key(name)
    }

    pub fn num_trackers(&self) -> usize {
        self.trackers.len()
    }

    pub fn cycle_count(&self) -> u64 {
        self.n_cycles
    }

    /// Drop every tracker and publish an empty list
    pub fn clear(&mut self) {
        self.trackers.clear();
        self.snapshot = Arc::new(Vec::new());
    }

    /// Drop one tracker and withdraw it from the published list
    pub fn remove(&mut self, name: &str) -> bool {
        if self.trackers.remove(name).is_none() {
            return false;
        }
        let remaining: Vec<ObjectSnapshot> = self
            .snapshot
            .iter()
            .filter(|object| object.name != name)
            .cloned()
            .collect();
        self.snapshot = Arc::new(remaining);
        true
    }
}
