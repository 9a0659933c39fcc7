use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// One raw object observation from the inference collaborator, for a single
/// frame. Produced fresh every frame; the engine never holds one past the
/// `process_frame` call that received it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
    /// Raw detector vocabulary label, e.g. "bottle". Matched against the
    /// catalog case-insensitively.
    pub label: String,
    /// Confidence score in `[0, 1]`.
    pub score: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, score: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            score,
            bbox,
        }
    }

    /// A detection is well-formed when its score is in range and its box has
    /// positive dimensions. Malformed detections are dropped at pipeline
    /// intake with a warning, never propagated as errors.
    pub fn is_well_formed(&self) -> bool {
        (0.0..=1.0).contains(&self.score) && self.bbox.width > 0.0 && self.bbox.height > 0.0
    }
}
