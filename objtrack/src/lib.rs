//! Name-keyed object tracking library
//!
//! Every distinct object name gets its own constant-velocity Kalman filter.
//! Measurements correct the filter by name (no data association is needed),
//! each cycle predicts all filters one step ahead, and filters that have not
//! been measured within the staleness window are evicted.
//!
//! ```rust,ignore
//! use objtrack::{Measurement, TrackingRegistry};
//!
//! let mut registry = TrackingRegistry::default();
//! let objects = registry.update_cycle(&[Measurement::new("cup", 0.5, 0.5, 0.1, 0.1)]);
//! println!("{}", objtrack::render_object_list(&objects));
//! ```

pub mod kalman;
pub mod measurement;
pub mod object_tracker;
pub mod registry;

pub use kalman::{KalmanFilter, KalmanFilterParams};
pub use measurement::{render_object_list, Measurement, ObjectSnapshot};
pub use object_tracker::{ObjectTracker, TrackerParams};
pub use registry::{Snapshot, TrackingRegistry};
