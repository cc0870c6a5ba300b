//! Per-cycle measurement records and the snapshot entries produced from them

use std::fmt;

/// One observed position/size sample for a named object in one cycle.
///
/// Coordinates are frame-relative: `(0, 0)` is the top-left corner of the
/// field of view and `(1, 1)` the bottom-right.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub name: String,
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
}

impl Measurement {
    pub fn new(name: impl Into<String>, center_x: f32, center_y: f32, width: f32, height: f32) -> Self {
        Self {
            name: name.into(),
            center_x,
            center_y,
            width,
            height,
        }
    }

    /// Build from box corners `(x1, y1)`-`(x2, y2)`
    pub fn from_corners(name: impl Into<String>, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(name, (x1 + x2) / 2.0, (y1 + y2) / 2.0, x2 - x1, y2 - y1)
    }

    /// Position part fed into the filter's correction step
    pub fn position(&self) -> [f32; 2] {
        [self.center_x, self.center_y]
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// True when every numeric field is finite and the name is non-empty
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
            && [self.center_x, self.center_y, self.width, self.height]
                .iter()
                .all(|v| v.is_finite())
    }
}

/// Read-only projection of a live tracker after prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSnapshot {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl fmt::Display for ObjectSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x:{:.2} y:{:.2} width:{:.2} height:{:.2}",
            self.name, self.x, self.y, self.width, self.height
        )
    }
}

/// Render a snapshot list as `[a x:.. y:.. width:.. height:.., b ...]`
pub fn render_object_list(objects: &[ObjectSnapshot]) -> String {
    let lines: Vec<String> = objects.iter().map(|o| o.to_string()).collect();
    format!("[{}]", lines.join(", "))
}
