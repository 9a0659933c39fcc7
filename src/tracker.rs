//! Short-lived identity tracking.
//!
//! A track is the engine's persistent notion of one physical object across
//! frames: absent → live → expired. Confirmation events fire exactly once,
//! at track creation, and are the only signal the counter consumes: a
//! re-matched track is the same object and must not be recounted.
//!
//! The tracker owns every `TrackedItem`; callers get clones.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use crate::catalog::{ClassifiedDetection, ItemType};
use crate::geometry::{iou, BoundingBox};

/// Default age after which an un-refreshed track is evicted.
pub const DEFAULT_TRACK_TTL_MS: i64 = 5000;

/// Monotonic track handle minted by the tracker. Never reused within a
/// tracker's lifetime, never derived from randomness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track:{}", self.0)
    }
}

/// One live tracked object.
#[derive(Clone, Debug)]
pub struct TrackedItem {
    pub id: TrackId,
    pub label: String,
    pub item_type: ItemType,
    pub bbox: BoundingBox,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Result of one frame observation.
#[derive(Clone, Debug, Default)]
pub struct FrameUpdate {
    /// Tracks created this frame, one per newly seen physical object.
    pub confirmed: Vec<TrackedItem>,
    /// All tracks still live after the eviction sweep, in id order.
    pub live: Vec<TrackedItem>,
}

pub struct IdentityTracker {
    tracks: BTreeMap<u64, TrackedItem>,
    next_id: u64,
    ttl: Duration,
    match_iou: f32,
}

impl IdentityTracker {
    pub fn new(match_iou: f32, ttl: StdDuration) -> Self {
        Self {
            tracks: BTreeMap::new(),
            next_id: 1,
            ttl: clamp_ttl(ttl),
            match_iou,
        }
    }

    /// Replace the eviction TTL. Applies from the next sweep on; already
    /// evicted tracks do not come back.
    pub fn set_ttl(&mut self, ttl: StdDuration) {
        self.ttl = clamp_ttl(ttl);
    }

    /// Replace the tracking-match IoU threshold (distinct from the NMS
    /// suppression threshold).
    pub fn set_match_iou(&mut self, match_iou: f32) {
        self.match_iou = match_iou;
    }

    /// Feed one frame's surviving detections through the tracker.
    ///
    /// Matching is greedy by IoU descending over (detection, live track)
    /// pairs with equal labels: when two detections contest one track, the
    /// higher-IoU detection wins and the other becomes a new track. Every
    /// track not re-matched keeps its `last_seen`; the sweep then evicts
    /// tracks older than the TTL. The sweep runs even for empty frames.
    pub fn observe(
        &mut self,
        detections: &[ClassifiedDetection],
        now: DateTime<Utc>,
    ) -> FrameUpdate {
        let mut update = FrameUpdate::default();

        // Candidate pairs above the match threshold, highest IoU first.
        // Ties break on (detection index, track id) so a frame replays
        // identically.
        let mut pairs: Vec<(f32, usize, u64)> = Vec::new();
        for (det_idx, classified) in detections.iter().enumerate() {
            for (track_id, track) in &self.tracks {
                if track.label != classified.detection.label {
                    continue;
                }
                let overlap = iou(&track.bbox, &classified.detection.bbox);
                if overlap >= self.match_iou {
                    pairs.push((overlap, det_idx, *track_id));
                }
            }
        }
        pairs.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.cmp(&b.2))
        });

        let mut det_matched = vec![false; detections.len()];
        let mut track_matched: BTreeMap<u64, bool> = BTreeMap::new();
        for (_, det_idx, track_id) in pairs {
            if det_matched[det_idx] || track_matched.contains_key(&track_id) {
                continue;
            }
            det_matched[det_idx] = true;
            track_matched.insert(track_id, true);

            // Re-match: refresh position and recency, no event.
            if let Some(track) = self.tracks.get_mut(&track_id) {
                track.bbox = detections[det_idx].detection.bbox;
                track.last_seen = now;
            }
        }

        // Unmatched detections become new tracks and are confirmed exactly
        // once, here.
        for (det_idx, classified) in detections.iter().enumerate() {
            if det_matched[det_idx] {
                continue;
            }
            let id = TrackId(self.next_id);
            self.next_id += 1;
            let track = TrackedItem {
                id,
                label: classified.detection.label.clone(),
                item_type: classified.item_type,
                bbox: classified.detection.bbox,
                first_seen: now,
                last_seen: now,
            };
            log::debug!("{} confirmed for '{}'", id, track.label);
            self.tracks.insert(id.0, track.clone());
            update.confirmed.push(track);
        }

        self.sweep(now);
        update.live = self.live_tracks();
        update
    }

    /// Evict tracks whose age exceeds the TTL.
    fn sweep(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.tracks.retain(|_, track| {
            let stale = now - track.last_seen > ttl;
            if stale {
                log::debug!("{} evicted after {}ms idle", track.id, ttl.num_milliseconds());
            }
            !stale
        });
    }

    /// Clones of all live tracks, in id order.
    pub fn live_tracks(&self) -> Vec<TrackedItem> {
        self.tracks.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl Default for IdentityTracker {
    fn default() -> Self {
        Self::new(0.3, StdDuration::from_millis(DEFAULT_TRACK_TTL_MS as u64))
    }
}

fn clamp_ttl(ttl: StdDuration) -> Duration {
    let ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    Duration::milliseconds(ms)
}
