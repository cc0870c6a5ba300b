/// Configuration for the vision skill layer
///
/// Every field has a tuned default; a JSON file only needs to name the
/// values it overrides.
use crate::error::{Result, VisionError};
use objtrack::TrackerParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Naming and geometric bias for fiducial-marker measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Prepended to the marker id to form the object name
    pub name_prefix: String,
    /// Added to the marker center y (the tracked feature sits below the marker)
    pub center_y_offset: f32,
    /// Added to the marker height
    pub height_offset: f32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            name_prefix: "door_".to_string(),
            center_y_offset: 0.1,
            height_offset: 0.3,
        }
    }
}

/// Trusted depth window inside the camera's field of view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    /// Width of the window centered at x = 0.5
    pub fov_x: f32,
    /// Height of the window centered at y = 0.5
    pub fov_y: f32,
    /// Reported for objects outside the window or without a depth map
    pub fallback_distance: i32,
    /// Raw depth units per reported distance unit
    pub depth_scale: i32,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            fov_x: 0.42,
            fov_y: 0.55,
            fallback_distance: 30,
            depth_scale: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// How often the background flow checks the frame generation
    pub poll_interval_ms: u64,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 20,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub tracker: TrackerParams,
    pub marker: MarkerConfig,
    pub depth: DepthConfig,
    pub operator: OperatorConfig,
}

impl VisionConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::info!("Loaded vision config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.tracker;
        for (label, value) in [
            ("tracker.measurement_noise_scale", t.measurement_noise_scale),
            ("tracker.initial_uncertainty_scale", t.initial_uncertainty_scale),
            ("tracker.process_noise_scale", t.process_noise_scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(VisionError::config(format!("{} must be positive, got {}", label, value)));
            }
        }
        if t.max_age.is_zero() {
            return Err(VisionError::config("tracker.max_age must be positive"));
        }

        let d = &self.depth;
        for (label, value) in [("depth.fov_x", d.fov_x), ("depth.fov_y", d.fov_y)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(VisionError::config(format!("{} must be in (0, 1], got {}", label, value)));
            }
        }
        if d.depth_scale <= 0 {
            return Err(VisionError::config(format!(
                "depth.depth_scale must be positive, got {}",
                d.depth_scale
            )));
        }

        if self.operator.poll_interval_ms == 0 {
            return Err(VisionError::config("operator.poll_interval_ms must be positive"));
        }
        Ok(())
    }
}
