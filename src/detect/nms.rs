//! Non-maximum suppression.
//!
//! Duplicate detections of the same physical object arrive as overlapping
//! boxes with slightly different scores. The sweep keeps the highest-scoring
//! box of each overlap cluster; the score threshold is applied after the
//! sweep, exactly in that order.

use std::cmp::Ordering;

use crate::detect::result::Detection;
use crate::geometry::iou;

/// De-duplicate one frame's detections.
///
/// Sorts by score descending (stable, so equal scores keep input order),
/// keeps a detection only when no higher-scoring kept detection overlaps it
/// with IoU >= `iou_threshold`, then drops kept detections scoring below
/// `score_threshold`. O(n²) in the per-frame detection count, which stays
/// small in practice.
pub fn suppress(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    score_threshold: f32,
) -> Vec<Detection> {
    if detections.is_empty() {
        return detections;
    }

    // Vec::sort_by is stable: ties break by input order, which makes the
    // "identical boxes, equal scores" case deterministic.
    detections.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = kept
            .iter()
            .any(|winner| iou(&winner.bbox, &candidate.bbox) >= iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }

    kept.retain(|d| d.score >= score_threshold);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn det(label: &str, score: f32, x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection::new(label, score, BoundingBox::new(x, y, w, h).unwrap())
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(suppress(Vec::new(), 0.5, 0.5).is_empty());
    }

    #[test]
    fn overlapping_pair_keeps_higher_score() {
        // Two reports of one bottle at IoU > 0.5; only the 0.9 survives.
        let out = suppress(
            vec![
                det("bottle", 0.9, 10.0, 10.0, 20.0, 20.0),
                det("bottle", 0.85, 12.0, 11.0, 20.0, 20.0),
            ],
            0.5,
            0.0,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 0.9);
    }

    #[test]
    fn disjoint_detections_all_survive() {
        let out = suppress(
            vec![
                det("bottle", 0.9, 0.0, 0.0, 10.0, 10.0),
                det("can", 0.8, 50.0, 50.0, 10.0, 10.0),
            ],
            0.5,
            0.0,
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn no_surviving_pair_exceeds_threshold() {
        let input = vec![
            det("a", 0.9, 0.0, 0.0, 20.0, 20.0),
            det("b", 0.8, 5.0, 5.0, 20.0, 20.0),
            det("c", 0.7, 10.0, 10.0, 20.0, 20.0),
            det("d", 0.6, 40.0, 40.0, 20.0, 20.0),
            det("e", 0.5, 42.0, 41.0, 20.0, 20.0),
        ];
        let out = suppress(input, 0.4, 0.0);
        for (i, a) in out.iter().enumerate() {
            for b in out.iter().skip(i + 1) {
                assert!(iou(&a.bbox, &b.bbox) < 0.4);
            }
        }
    }

    #[test]
    fn identical_boxes_equal_scores_first_wins() {
        let out = suppress(
            vec![
                det("first", 0.8, 10.0, 10.0, 20.0, 20.0),
                det("second", 0.8, 10.0, 10.0, 20.0, 20.0),
            ],
            0.5,
            0.0,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "first");
    }

    #[test]
    fn score_threshold_applies_after_sweep() {
        // The low-score detection is suppressed by the high one, and the
        // remaining mid-score survivor falls to the threshold afterwards.
        let out = suppress(
            vec![
                det("a", 0.9, 0.0, 0.0, 20.0, 20.0),
                det("b", 0.3, 2.0, 1.0, 20.0, 20.0),
                det("c", 0.4, 60.0, 60.0, 20.0, 20.0),
            ],
            0.5,
            0.5,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "a");
    }
}
