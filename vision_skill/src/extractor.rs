/// Measurement extraction from both sensing pipelines
///
/// Learned-detector boxes are already frame-relative; fiducial marker corners
/// are in pixels and get normalized by the frame dimensions. Both end up as
/// `objtrack::Measurement` in one ordered batch, learned detections first.
use crate::config::MarkerConfig;
use crate::types::{Detections, LabeledDetection, MarkerDetection};
use objtrack::Measurement;

#[derive(Debug, Clone, Default)]
pub struct MeasurementExtractor {
    marker: MarkerConfig,
}

impl MeasurementExtractor {
    pub fn new(marker: MarkerConfig) -> Self {
        Self { marker }
    }

    /// Object name for a marker id, e.g. `door_7`
    pub fn marker_name(&self, id: u32) -> String {
        format!("{}{}", self.marker.name_prefix, id)
    }

    /// Convert one frame's detections; malformed entries are skipped
    pub fn extract(&self, detections: &Detections, frame_dims: (u32, u32)) -> Vec<Measurement> {
        let mut measurements =
            Vec::with_capacity(detections.learned.len() + detections.fiducials.len());

        measurements.extend(
            detections
                .learned
                .iter()
                .filter_map(|det| self.measure_learned(det)),
        );
        measurements.extend(
            detections
                .fiducials
                .iter()
                .filter_map(|marker| self.measure_marker(marker, frame_dims)),
        );

        log::trace!(
            "Extracted {} measurements from {} learned + {} markers",
            measurements.len(),
            detections.learned.len(),
            detections.fiducials.len()
        );
        measurements
    }

    pub fn measure_learned(&self, det: &LabeledDetection) -> Option<Measurement> {
        if det.name.is_empty() || !det.bbox.is_well_formed() {
            log::warn!("Skipping malformed detection {:?}", det);
            return None;
        }
        let b = &det.bbox;
        Some(Measurement::from_corners(det.name.clone(), b.x1, b.y1, b.x2, b.y2))
    }

    pub fn measure_marker(&self, marker: &MarkerDetection, frame_dims: (u32, u32)) -> Option<Measurement> {
        let (frame_w, frame_h) = frame_dims;
        if frame_w == 0 || frame_h == 0 {
            log::warn!("Skipping marker {}: frame dimensions unknown", marker.id);
            return None;
        }
        let corners: &[[f32; 2]; 4] = match marker.corners.as_slice().try_into() {
            Ok(corners) => corners,
            Err(_) => {
                log::debug!(
                    "Skipping marker {}: expected 4 corners, got {}",
                    marker.id,
                    marker.corners.len()
                );
                return None;
            }
        };
        if corners.iter().flatten().any(|v| !v.is_finite()) {
            log::debug!("Skipping marker {}: non-finite corner", marker.id);
            return None;
        }
        if is_degenerate(corners) {
            log::debug!("Skipping marker {}: degenerate quadrilateral", marker.id);
            return None;
        }

        let (fw, fh) = (frame_w as f32, frame_h as f32);
        let sum_x: f32 = corners.iter().map(|c| c[0]).sum();
        let sum_y: f32 = corners.iter().map(|c| c[1]).sum();

        let center_x = sum_x / 4.0 / fw;
        let center_y = sum_y / 4.0 / fh + self.marker.center_y_offset;
        let width = (corners[1][0] - corners[0][0]).abs() / fw;
        let height = (corners[2][1] - corners[0][1]).abs() / fh + self.marker.height_offset;

        Some(Measurement::new(
            self.marker_name(marker.id),
            center_x,
            center_y,
            width,
            height,
        ))
    }
}

/// Zero extent along either axis
fn is_degenerate(corners: &[[f32; 2]; 4]) -> bool {
    let span = |axis: usize| {
        let (lo, hi) = corners
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), c| {
                (lo.min(c[axis]), hi.max(c[axis]))
            });
        hi - lo
    };
    span(0) <= 0.0 || span(1) <= 0.0
}
