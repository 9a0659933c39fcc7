//! recount - detection post-processing and counting engine
//!
//! Turns per-frame object-detection results from an external inference
//! service into de-duplicated, area-filtered, time-bucketed counts of
//! recyclable-item classes.
//!
//! # Pipeline
//!
//! Each frame flows through five stages, in order:
//!
//! 1. Non-max suppression - duplicate boxes of one object collapse to the
//!    highest-scoring survivor.
//! 2. Item classification - raw detector labels resolve to domain item
//!    types through the configurable catalog.
//! 3. Region filtering - only boxes fully inside the detection area pass.
//! 4. Identity tracking - survivors match live tracks by label + IoU; a new
//!    track fires exactly one confirmation event; stale tracks expire.
//! 5. Counting - confirmation events accumulate into dated buckets, with
//!    weekly/monthly/all-time rollups derived by summation.
//!
//! # Module Structure
//!
//! - `geometry`: validated boxes, IoU
//! - `detect`: the `Detection` type, the inference-backend seam, NMS
//! - `catalog`: item types and label catalog
//! - `region`: detection area and containment filter
//! - `tracker`: short-lived identity tracking
//! - `counter`: bucketed counter store over a key-value state store
//! - `engine`: the pipeline façade and configuration surface
//! - `config`: file + environment configuration loading
//!
//! The engine is single-threaded and frame-driven; the caller owns the tick
//! loop and cancellation (stop ticking, discard in-flight results).

pub mod catalog;
pub mod config;
pub mod counter;
pub mod detect;
pub mod engine;
pub mod geometry;
pub mod region;
pub mod tracker;

pub use catalog::{ClassifiedDetection, ClassifierTarget, ItemCatalog, ItemType};
pub use config::RecountConfig;
pub use counter::{
    BucketCount, CounterStore, InMemoryStateStore, Rollup, SqliteStateStore, StateStore,
};
pub use detect::{is_model_not_ready, Detection, DetectorBackend, ModelNotReady, StubBackend};
pub use engine::{Engine, EngineConfig, Thresholds};
pub use geometry::{iou, BoundingBox};
pub use region::{AreaUnit, DetectionArea};
pub use tracker::{FrameUpdate, IdentityTracker, TrackId, TrackedItem, DEFAULT_TRACK_TTL_MS};
