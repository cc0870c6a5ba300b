//! Raw detector output consumed by the measurement extractor

use crate::error::{Result, VisionError};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Box corners reported by the learned detector, frame-relative
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl DetectionBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Finite corners with `x2 >= x1` and `y2 >= y1`
    pub fn is_well_formed(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x2 >= self.x1
            && self.y2 >= self.y1
    }
}

/// One labeled box from the learned detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledDetection {
    pub name: String,
    #[serde(rename = "box")]
    pub bbox: DetectionBox,
}

impl LabeledDetection {
    pub fn new(name: impl Into<String>, bbox: DetectionBox) -> Self {
        Self {
            name: name.into(),
            bbox,
        }
    }
}

/// Detector service payload: base model results plus custom model results.
///
/// Unknown fields (confidence, class ids) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorOutput {
    #[serde(default)]
    pub result: Vec<LabeledDetection>,
    #[serde(default)]
    pub result_custom: Vec<LabeledDetection>,
}

impl DetectorOutput {
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Base results followed by custom results
    pub fn into_learned(self) -> Vec<LabeledDetection> {
        let mut learned = self.result;
        learned.extend(self.result_custom);
        learned
    }
}

/// One fiducial marker: its decoded id and corner points in pixels.
///
/// Corners follow the detector's order: top-left, top-right, bottom-right,
/// bottom-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub id: u32,
    pub corners: Vec<[f32; 2]>,
}

impl MarkerDetection {
    pub fn new(id: u32, corners: Vec<[f32; 2]>) -> Self {
        Self { id, corners }
    }
}

/// Everything both sensing pipelines reported for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detections {
    pub learned: Vec<LabeledDetection>,
    pub fiducials: Vec<MarkerDetection>,
}

impl Detections {
    pub fn new(learned: Vec<LabeledDetection>, fiducials: Vec<MarkerDetection>) -> Self {
        Self { learned, fiducials }
    }

    pub fn is_empty(&self) -> bool {
        self.learned.is_empty() && self.fiducials.is_empty()
    }
}

/// Depth samples in raw sensor units (millimeters), indexed `[row, col]`
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    data: Array2<u16>,
}

impl DepthMap {
    pub fn new(data: Array2<u16>) -> Self {
        Self { data }
    }

    pub fn from_shape_vec(rows: usize, cols: usize, samples: Vec<u16>) -> Result<Self> {
        let data = Array2::from_shape_vec((rows, cols), samples)
            .map_err(|e| VisionError::depth_map(e.to_string()))?;
        Ok(Self { data })
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u16> {
        self.data.get((row, col)).copied()
    }

    pub fn data(&self) -> &Array2<u16> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_output_from_json() {
        let payload = r#"{
            "result": [
                {"name": "cup", "confidence": 0.91, "box": {"x1": 0.1, "y1": 0.2, "x2": 0.3, "y2": 0.4}}
            ],
            "result_custom": [
                {"name": "sponge", "box": {"x1": 0.5, "y1": 0.5, "x2": 0.6, "y2": 0.7}}
            ]
        }"#;
        let output = DetectorOutput::from_json(payload).unwrap();
        assert_eq!(output.result.len(), 1);
        assert_eq!(output.result_custom.len(), 1);

        let learned = output.into_learned();
        assert_eq!(learned[0].name, "cup");
        assert_eq!(learned[1].name, "sponge");
        assert_eq!(learned[1].bbox, DetectionBox::new(0.5, 0.5, 0.6, 0.7));
    }

    #[test]
    fn test_detector_output_missing_lists() {
        let output = DetectorOutput::from_json(r#"{"result": []}"#).unwrap();
        assert!(output.into_learned().is_empty());
        assert!(DetectorOutput::from_json("not json").is_err());
    }

    #[test]
    fn test_box_well_formed() {
        assert!(DetectionBox::new(0.1, 0.1, 0.2, 0.2).is_well_formed());
        assert!(!DetectionBox::new(0.3, 0.1, 0.2, 0.2).is_well_formed());
        assert!(!DetectionBox::new(0.1, f32::INFINITY, 0.2, 0.2).is_well_formed());
    }

    #[test]
    fn test_depth_map_shape() {
        let depth = DepthMap::from_shape_vec(2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(depth.rows(), 2);
        assert_eq!(depth.cols(), 3);
        assert_eq!(depth.get(1, 0), Some(4));
        assert_eq!(depth.get(2, 0), None);
        assert!(DepthMap::from_shape_vec(2, 3, vec![1, 2]).is_err());
    }
}
