//! The per-frame pipeline façade.
//!
//! One `Engine` owns the five processing stages and funnels every counter
//! mutation through them. The engine never schedules itself: the caller
//! invokes [`Engine::process_frame`] once per inference result, and stopping
//! a session is simply "stop calling it" (discarding any result that was
//! still in flight).

use std::time::Duration as StdDuration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::catalog::{ClassifierTarget, ItemCatalog, ItemType};
use crate::counter::CounterStore;
use crate::detect::{suppress, Detection};
use crate::region::{AreaUnit, DetectionArea};
use crate::tracker::{FrameUpdate, IdentityTracker, DEFAULT_TRACK_TTL_MS};

/// Score and overlap thresholds, all in `[0, 1]`.
///
/// `track_match_iou` is distinct from `nms_iou`: suppression asks "same
/// detection?", tracking asks "same object as last frame?", and the latter
/// tolerates more drift.
#[derive(Clone, Copy, Debug)]
pub struct Thresholds {
    pub nms_iou: f32,
    pub score: f32,
    pub track_match_iou: f32,
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("nms_iou", self.nms_iou),
            ("score", self.score),
            ("track_match_iou", self.track_match_iou),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("threshold {} must be in [0, 1], got {}", name, value));
            }
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            nms_iou: 0.5,
            score: 0.5,
            track_match_iou: 0.3,
        }
    }
}

/// Everything the engine needs at construction.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Coordinate space for the detection area AND all detection boxes.
    /// Declared once; the engine never converts units.
    pub area_unit: AreaUnit,
    pub detection_area: DetectionArea,
    pub catalog: ItemCatalog,
    pub target: ClassifierTarget,
    pub thresholds: Thresholds,
    pub track_ttl: StdDuration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            area_unit: AreaUnit::Percent,
            detection_area: DetectionArea::full_frame(),
            catalog: ItemCatalog::default(),
            target: ClassifierTarget::All,
            thresholds: Thresholds::default(),
            track_ttl: StdDuration::from_millis(DEFAULT_TRACK_TTL_MS as u64),
        }
    }
}

pub struct Engine {
    area_unit: AreaUnit,
    area: DetectionArea,
    catalog: ItemCatalog,
    target: ClassifierTarget,
    thresholds: Thresholds,
    tracker: IdentityTracker,
    counter: CounterStore,
}

impl Engine {
    pub fn new(config: EngineConfig, counter: CounterStore) -> Result<Self> {
        config.thresholds.validate()?;
        let tracker = IdentityTracker::new(config.thresholds.track_match_iou, config.track_ttl);
        Ok(Self {
            area_unit: config.area_unit,
            area: config.detection_area,
            catalog: config.catalog,
            target: config.target,
            thresholds: config.thresholds,
            tracker,
            counter,
        })
    }

    /// Run one frame through suppression, classification, region filtering,
    /// tracking, and counting.
    ///
    /// Malformed detections (out-of-range score, non-positive box) are
    /// dropped with a warning. Returns the confirmation events (one per
    /// newly seen physical object, already counted) and the live tracks.
    pub fn process_frame(
        &mut self,
        detections: Vec<Detection>,
        now: DateTime<Utc>,
    ) -> Result<FrameUpdate> {
        let mut sane = Vec::with_capacity(detections.len());
        for detection in detections {
            if detection.is_well_formed() {
                sane.push(detection);
            } else {
                log::warn!(
                    "dropping malformed detection '{}' (score {}, box {}x{})",
                    detection.label,
                    detection.score,
                    detection.bbox.width,
                    detection.bbox.height
                );
            }
        }

        let deduped = suppress(sane, self.thresholds.nms_iou, self.thresholds.score);
        let classified = self.catalog.classify(deduped, self.target);
        let in_area = self.area.filter(classified);
        let update = self.tracker.observe(&in_area, now);

        for track in &update.confirmed {
            self.counter.apply(track.item_type, 1, now)?;
        }

        Ok(update)
    }

    // -------------------- configuration surface --------------------

    /// Replace the detection area. Takes effect on the next frame; past
    /// frames are never reclassified. The area must be expressed in the
    /// engine's declared unit.
    pub fn set_detection_area(&mut self, area: DetectionArea) {
        self.area = area;
    }

    pub fn set_catalog_entry<I, S>(&mut self, item: ItemType, labels: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.catalog.set_entry(item, labels)
    }

    pub fn set_track_ttl(&mut self, ttl: StdDuration) {
        self.tracker.set_ttl(ttl);
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<()> {
        thresholds.validate()?;
        self.thresholds = thresholds;
        self.tracker.set_match_iou(thresholds.track_match_iou);
        Ok(())
    }

    pub fn set_target(&mut self, target: ClassifierTarget) {
        self.target = target;
    }

    // -------------------- read access --------------------

    pub fn area_unit(&self) -> AreaUnit {
        self.area_unit
    }

    pub fn detection_area(&self) -> DetectionArea {
        self.area
    }

    pub fn counter(&self) -> &CounterStore {
        &self.counter
    }

    /// Mutable counter access for manual counts and resets; all bucket
    /// mutation still goes through the store's own operations.
    pub fn counter_mut(&mut self) -> &mut CounterStore {
        &mut self.counter
    }

    pub fn live_tracks(&self) -> Vec<crate::tracker::TrackedItem> {
        self.tracker.live_tracks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::InMemoryStateStore;
    use crate::geometry::BoundingBox;

    fn engine() -> Engine {
        let counter = CounterStore::open(Box::new(InMemoryStateStore::new())).unwrap();
        Engine::new(EngineConfig::default(), counter).unwrap()
    }

    fn det(label: &str, score: f32, x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection::new(label, score, BoundingBox::new(x, y, w, h).unwrap())
    }

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
    }

    #[test]
    fn malformed_detection_is_dropped_not_fatal() {
        let mut engine = engine();
        let mut bad = det("bottle", 0.9, 10.0, 10.0, 20.0, 20.0);
        bad.bbox.width = -5.0;
        let update = engine.process_frame(vec![bad], at(0)).unwrap();
        assert!(update.confirmed.is_empty());
    }

    #[test]
    fn straddling_detection_never_reaches_the_tracker() {
        let mut engine = engine();
        let update = engine
            .process_frame(vec![det("bottle", 0.9, 90.0, 90.0, 20.0, 20.0)], at(0))
            .unwrap();
        assert!(update.confirmed.is_empty());
        assert!(engine.live_tracks().is_empty());
    }

    #[test]
    fn duplicate_boxes_count_once() {
        let mut engine = engine();
        let update = engine
            .process_frame(
                vec![
                    det("bottle", 0.9, 10.0, 10.0, 20.0, 20.0),
                    det("bottle", 0.85, 12.0, 11.0, 20.0, 20.0),
                ],
                at(0),
            )
            .unwrap();
        assert_eq!(update.confirmed.len(), 1);
        assert_eq!(engine.counter().total(ItemType::Pet1), 1);
    }

    #[test]
    fn area_change_applies_from_next_frame() {
        let mut engine = engine();
        let inside = det("bottle", 0.9, 10.0, 10.0, 20.0, 20.0);

        let update = engine.process_frame(vec![inside.clone()], at(0)).unwrap();
        assert_eq!(update.confirmed.len(), 1);

        // Shrink the area so the same box now straddles its edge.
        engine.set_detection_area(DetectionArea::new(0.0, 0.0, 25.0, 25.0).unwrap());
        let update = engine.process_frame(vec![inside], at(100)).unwrap();
        assert!(update.confirmed.is_empty());
    }

    #[test]
    fn single_target_mode_ignores_other_items() {
        let mut engine = engine();
        engine.set_target(ClassifierTarget::Single(ItemType::AluminumCan));
        let update = engine
            .process_frame(
                vec![
                    det("bottle", 0.9, 10.0, 10.0, 20.0, 20.0),
                    det("can", 0.9, 50.0, 50.0, 20.0, 20.0),
                ],
                at(0),
            )
            .unwrap();
        assert_eq!(update.confirmed.len(), 1);
        assert_eq!(update.confirmed[0].item_type, ItemType::AluminumCan);
        assert_eq!(engine.counter().total(ItemType::Pet1), 0);
    }

    #[test]
    fn invalid_thresholds_rejected() {
        let mut engine = engine();
        let bad = Thresholds {
            nms_iou: 1.5,
            ..Thresholds::default()
        };
        assert!(engine.set_thresholds(bad).is_err());

        let counter = CounterStore::open(Box::new(InMemoryStateStore::new())).unwrap();
        let config = EngineConfig {
            thresholds: Thresholds {
                score: -0.1,
                ..Thresholds::default()
            },
            ..EngineConfig::default()
        };
        assert!(Engine::new(config, counter).is_err());
    }
}
