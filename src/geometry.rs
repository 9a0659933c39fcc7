//! Axis-aligned box geometry.
//!
//! Boxes are validated at construction: zero or negative dimensions are
//! rejected, which is what makes the IoU denominator strictly positive for
//! any pair of boxes that exist.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in the engine's declared unit space.
///
/// `width` and `height` are strictly positive; use [`BoundingBox::new`] to
/// construct one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Create a box, rejecting non-positive dimensions.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Result<Self> {
        if !(width > 0.0) || !(height > 0.0) {
            return Err(anyhow!(
                "bounding box dimensions must be positive (got {}x{})",
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

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Center point, used for nothing load-bearing; handy in logs.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Intersection over union of two boxes, in `[0, 1]`.
///
/// Returns 0.0 for disjoint boxes. The denominator cannot be zero because
/// both boxes have positive area by construction.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = a.right().min(b.right());
    let y2 = a.bottom().min(b.bottom());

    let inter_w = (x2 - x1).max(0.0);
    let inter_h = (y2 - y1).max(0.0);
    let inter = inter_w * inter_h;

    let union = a.area() + b.area() - inter;
    inter / union
}
