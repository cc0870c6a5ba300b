//! Vision skill layer
//!
//! Fuses the learned object detector's labeled boxes and the fiducial-marker
//! detector's quadrilaterals into one name-keyed, Kalman-smoothed object list
//! and answers visibility, position, size and distance queries over it.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vision_skill::{SharedFrame, VisionConfig, VisionSkills};
//!
//! let frame = Arc::new(SharedFrame::new());
//! let skills = VisionSkills::new(Arc::clone(&frame), &VisionConfig::default());
//! if skills.is_visible("door") {
//!     println!("door at x={:.2}", skills.x("door")?);
//! }
//! ```

pub mod config;
pub mod depth;
pub mod error;
pub mod extractor;
pub mod frame_source;
pub mod operator;
pub mod service;
pub mod skills;
pub mod types;

pub use config::{DepthConfig, MarkerConfig, OperatorConfig, VisionConfig};
pub use depth::DepthWindow;
pub use error::{Result, VisionError};
pub use extractor::MeasurementExtractor;
pub use frame_source::{FramePacket, FrameSource, SharedFrame};
pub use objtrack::{Measurement, ObjectSnapshot, TrackerParams};
pub use operator::TrackingOperator;
pub use service::TrackingService;
pub use skills::VisionSkills;
pub use types::{
    DepthMap, DetectionBox, DetectorOutput, Detections, LabeledDetection, MarkerDetection,
};
