//! The user-configured detection area and its containment filter.
//!
//! The filter is full-containment by contract: a box that straddles the area
//! boundary is rejected, a box whose edges lie exactly on the boundary is
//! inside. Area changes take effect on the next frame; past frames are never
//! reclassified.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::ClassifiedDetection;
use crate::geometry::BoundingBox;

/// Coordinate space the engine runs in.
///
/// Declared once at engine construction; the detection area and every
/// detection box must be expressed in the same unit. The engine never
/// converts between units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    /// Percent of frame, 0..=100 on both axes.
    #[default]
    Percent,
    /// Absolute pixels.
    Pixels,
}

/// Rectangular region of interest.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionArea {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DetectionArea {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Result<Self> {
        if !(width > 0.0) || !(height > 0.0) {
            return Err(anyhow!(
                "detection area dimensions must be positive (got {}x{})",
                width,
                height
            ));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// The whole percent-space frame, the default region.
    pub fn full_frame() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        }
    }

    /// True iff `bbox` lies entirely inside this area.
    pub fn contains(&self, bbox: &BoundingBox) -> bool {
        bbox.x >= self.x
            && bbox.y >= self.y
            && bbox.x + bbox.width <= self.x + self.width
            && bbox.y + bbox.height <= self.y + self.height
    }

    /// Keep only detections fully inside the area.
    pub fn filter(&self, detections: Vec<ClassifiedDetection>) -> Vec<ClassifiedDetection> {
        detections
            .into_iter()
            .filter(|c| self.contains(&c.detection.bbox))
            .collect()
    }
}

impl Default for DetectionArea {
    fn default() -> Self {
        Self::full_frame()
    }
}
