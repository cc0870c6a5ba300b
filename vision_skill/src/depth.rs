/// Distance lookup through the trusted depth window
///
/// The depth sensor covers less than the camera's field of view, so only
/// objects whose center lies inside a fixed window around the image center
/// are sampled. Everything else reports the configured fallback distance.
use crate::config::DepthConfig;
use crate::types::DepthMap;

#[derive(Debug, Clone, Default)]
pub struct DepthWindow {
    config: DepthConfig,
}

impl DepthWindow {
    pub fn new(config: DepthConfig) -> Self {
        Self { config }
    }

    fn start_x(&self) -> f32 {
        0.5 - self.config.fov_x / 2.0
    }

    fn start_y(&self) -> f32 {
        0.5 - self.config.fov_y / 2.0
    }

    /// Inclusive window test on a frame-relative center
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let half_x = self.config.fov_x / 2.0;
        let half_y = self.config.fov_y / 2.0;
        x >= 0.5 - half_x && x <= 0.5 + half_x && y >= 0.5 - half_y && y <= 0.5 + half_y
    }

    /// Map a center inside the window to a `(row, col)` depth-map index
    pub fn pixel_index(&self, x: f32, y: f32, depth: &DepthMap) -> (usize, usize) {
        let col = (x - self.start_x()) / self.config.fov_x * depth.cols().saturating_sub(1) as f32;
        let row = (y - self.start_y()) / self.config.fov_y * depth.rows().saturating_sub(1) as f32;
        // truncation toward zero; negative rounding noise clamps to 0
        (row as usize, col as usize)
    }

    /// Distance in reported units for an object centered at `(x, y)`
    pub fn distance(&self, x: f32, y: f32, depth: Option<&DepthMap>) -> i32 {
        if !self.contains(x, y) {
            return self.config.fallback_distance;
        }
        let Some(depth) = depth.filter(|d| !d.is_empty()) else {
            log::debug!("No depth map for ({:.3}, {:.3}), using fallback", x, y);
            return self.config.fallback_distance;
        };

        let (row, col) = self.pixel_index(x, y, depth);
        match depth.get(row, col) {
            Some(raw) => i32::from(raw)
                .checked_div(self.config.depth_scale)
                .unwrap_or(self.config.fallback_distance),
            None => {
                log::warn!(
                    "Depth index ({}, {}) outside {}x{} map",
                    row,
                    col,
                    depth.rows(),
                    depth.cols()
                );
                self.config.fallback_distance
            }
        }
    }
}
