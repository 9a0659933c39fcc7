use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::catalog::{ClassifierTarget, ItemCatalog, ItemType};
use crate::engine::{EngineConfig, Thresholds};
use crate::region::{AreaUnit, DetectionArea};

const DEFAULT_DB_PATH: &str = "recount.db";

#[derive(Debug, Deserialize, Default)]
struct RecountConfigFile {
    db_path: Option<String>,
    area_unit: Option<AreaUnit>,
    detection_area: Option<AreaConfigFile>,
    /// "all" or one item key (e.g. "aluminum_can").
    target_item: Option<String>,
    thresholds: Option<ThresholdsConfigFile>,
    track_ttl_ms: Option<u64>,
    /// Item key -> accepted labels. Replaces the default entry per key.
    catalog: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Deserialize, Default)]
struct AreaConfigFile {
    x: Option<f32>,
    y: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ThresholdsConfigFile {
    nms_iou: Option<f32>,
    score: Option<f32>,
    track_match_iou: Option<f32>,
}

/// Daemon configuration: engine settings plus the counter database path.
#[derive(Clone, Debug)]
pub struct RecountConfig {
    pub db_path: String,
    pub engine: EngineConfig,
}

impl RecountConfig {
    /// Load from the JSON file named by `RECOUNT_CONFIG` (when set), then
    /// apply environment overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("RECOUNT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: RecountConfigFile) -> Result<Self> {
        let db_path = file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let defaults = EngineConfig::default();
        let area_unit = file.area_unit.unwrap_or(defaults.area_unit);

        let detection_area = match file.detection_area {
            Some(area) => DetectionArea::new(
                area.x.unwrap_or(0.0),
                area.y.unwrap_or(0.0),
                area.width.unwrap_or(100.0),
                area.height.unwrap_or(100.0),
            )?,
            None => defaults.detection_area,
        };

        let target = match file.target_item.as_deref() {
            None => defaults.target,
            Some(raw) => parse_target(raw)?,
        };

        let thresholds = match file.thresholds {
            Some(t) => Thresholds {
                nms_iou: t.nms_iou.unwrap_or(defaults.thresholds.nms_iou),
                score: t.score.unwrap_or(defaults.thresholds.score),
                track_match_iou: t
                    .track_match_iou
                    .unwrap_or(defaults.thresholds.track_match_iou),
            },
            None => defaults.thresholds,
        };

        let track_ttl = file
            .track_ttl_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.track_ttl);

        let mut catalog = ItemCatalog::default();
        if let Some(entries) = file.catalog {
            for (key, labels) in entries {
                let item: ItemType = key.parse()?;
                catalog.set_entry(item, labels)?;
            }
        }

        Ok(Self {
            db_path,
            engine: EngineConfig {
                area_unit,
                detection_area,
                catalog,
                target,
                thresholds,
                track_ttl,
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("RECOUNT_DB_PATH") {
            if !path.trim().is_empty() {
                self.db_path = path;
            }
        }
        if let Ok(target) = std::env::var("RECOUNT_TARGET_ITEM") {
            if !target.trim().is_empty() {
                self.engine.target = parse_target(&target)?;
            }
        }
        if let Ok(ttl) = std::env::var("RECOUNT_TRACK_TTL_MS") {
            let ms: u64 = ttl
                .parse()
                .map_err(|_| anyhow!("RECOUNT_TRACK_TTL_MS must be an integer number of ms"))?;
            self.engine.track_ttl = Duration::from_millis(ms);
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.engine.thresholds.validate()?;
        if self.engine.track_ttl.is_zero() {
            return Err(anyhow!("track TTL must be greater than zero"));
        }
        Ok(())
    }
}

fn parse_target(raw: &str) -> Result<ClassifierTarget> {
    if raw.trim().eq_ignore_ascii_case("all") {
        Ok(ClassifierTarget::All)
    } else {
        Ok(ClassifierTarget::Single(raw.parse()?))
    }
}

fn read_config_file(path: &Path) -> Result<RecountConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
