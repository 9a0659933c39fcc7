use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::backend::{DetectorBackend, ModelNotReady};
use crate::detect::result::Detection;
use crate::geometry::BoundingBox;

/// Labels the synthetic scene cycles through; each maps to a catalog entry
/// in the default configuration.
const SCENE_LABELS: [&str; 4] = ["bottle", "can", "carton", "jug"];

/// How many frames one synthetic object cycle lasts, and for how many of
/// those the object is in view.
const CYCLE_FRAMES: u64 = 40;
const DWELL_FRAMES: u64 = 12;

/// Stub backend for tests and the demo daemon.
///
/// Simulates a conveyor scene in percent space: an object enters every
/// [`CYCLE_FRAMES`] frames, stays in view for [`DWELL_FRAMES`] frames with a
/// slowly drifting box, and occasionally produces a duplicate echo box so
/// the suppressor has work to do. Pixels are ignored.
pub struct StubBackend {
    frame_count: u64,
    warmup_frames: u64,
    rng: StdRng,
}

impl StubBackend {
    pub fn new(seed: u64) -> Self {
        Self {
            frame_count: 0,
            warmup_frames: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Report [`ModelNotReady`] for the first `frames` detect calls, the way
    /// a real backend behaves while its model is still loading.
    pub fn with_warmup(mut self, frames: u64) -> Self {
        self.warmup_frames = frames;
        self
    }

    fn jitter(&mut self, spread: f32) -> f32 {
        self.rng.gen_range(-spread..=spread)
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>> {
        self.frame_count += 1;
        if self.frame_count <= self.warmup_frames {
            return Err(ModelNotReady.into());
        }

        let phase = self.frame_count % CYCLE_FRAMES;
        if phase >= DWELL_FRAMES {
            return Ok(Vec::new());
        }

        let cycle = self.frame_count / CYCLE_FRAMES;
        let label = SCENE_LABELS[(cycle % SCENE_LABELS.len() as u64) as usize];

        // The object drifts a little between frames but stays well inside
        // the default full-frame area.
        let x = 32.0 + phase as f32 * 0.4 + self.jitter(0.6);
        let y = 36.0 + self.jitter(0.6);
        let bbox = BoundingBox::new(x, y, 18.0, 22.0)?;
        let score = 0.86 + self.jitter(0.04);

        let mut detections = vec![Detection::new(label, score, bbox)];

        // Every third in-view frame the "model" also reports a lower-scoring
        // duplicate of the same object.
        if phase % 3 == 0 {
            let echo = BoundingBox::new(x + 1.5, y + 1.0, 18.0, 22.0)?;
            detections.push(Detection::new(label, score - 0.12, echo));
        }

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backend::is_model_not_ready;

    #[test]
    fn warmup_frames_report_model_not_ready() {
        let mut backend = StubBackend::new(7).with_warmup(2);
        for _ in 0..2 {
            let err = backend.detect(&[], 640, 480).unwrap_err();
            assert!(is_model_not_ready(&err));
        }
        assert!(backend.detect(&[], 640, 480).is_ok());
    }

    #[test]
    fn in_view_frames_produce_well_formed_detections() {
        let mut backend = StubBackend::new(7);
        let mut saw_detections = false;
        let mut saw_empty = false;
        for _ in 0..CYCLE_FRAMES {
            let detections = backend.detect(&[], 640, 480).unwrap();
            if detections.is_empty() {
                saw_empty = true;
            } else {
                saw_detections = true;
                assert!(detections.iter().all(Detection::is_well_formed));
            }
        }
        assert!(saw_detections);
        assert!(saw_empty);
    }
}
