use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use recount::{AreaUnit, ClassifierTarget, ItemType, RecountConfig};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "RECOUNT_CONFIG",
        "RECOUNT_DB_PATH",
        "RECOUNT_TARGET_ITEM",
        "RECOUNT_TRACK_TTL_MS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "db_path": "counts_prod.db",
        "area_unit": "percent",
        "detection_area": { "x": 10, "y": 10, "width": 60, "height": 70 },
        "target_item": "aluminum_can",
        "thresholds": { "nms_iou": 0.45, "score": 0.6, "track_match_iou": 0.25 },
        "track_ttl_ms": 3000,
        "catalog": {
            "aluminum_can": ["can", "beverage can"]
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("RECOUNT_CONFIG", file.path());
    std::env::set_var("RECOUNT_TARGET_ITEM", "all");
    std::env::set_var("RECOUNT_TRACK_TTL_MS", "4500");

    let cfg = RecountConfig::load().expect("load config");

    assert_eq!(cfg.db_path, "counts_prod.db");
    assert_eq!(cfg.engine.area_unit, AreaUnit::Percent);
    assert_eq!(cfg.engine.detection_area.x, 10.0);
    assert_eq!(cfg.engine.detection_area.width, 60.0);
    // Env overrides beat the file.
    assert_eq!(cfg.engine.target, ClassifierTarget::All);
    assert_eq!(cfg.engine.track_ttl, Duration::from_millis(4500));
    assert_eq!(cfg.engine.thresholds.nms_iou, 0.45);
    assert_eq!(cfg.engine.thresholds.score, 0.6);
    // Catalog entry replaced by the file.
    assert!(cfg.engine.catalog.accepts(ItemType::AluminumCan, "beverage can"));
    assert!(!cfg.engine.catalog.accepts(ItemType::AluminumCan, "tin can"));
    // Untouched entries keep their defaults.
    assert!(cfg.engine.catalog.accepts(ItemType::Pet1, "bottle"));

    clear_env();
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = RecountConfig::load().expect("load defaults");
    assert_eq!(cfg.db_path, "recount.db");
    assert_eq!(cfg.engine.detection_area.width, 100.0);
    assert_eq!(cfg.engine.target, ClassifierTarget::All);
    assert_eq!(cfg.engine.track_ttl, Duration::from_millis(5000));

    clear_env();
}

#[test]
fn invalid_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "thresholds": { "nms_iou": 1.5 } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("RECOUNT_CONFIG", file.path());
    assert!(RecountConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "detection_area": { "width": 0 } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("RECOUNT_CONFIG", file.path());
    assert!(RecountConfig::load().is_err());
    clear_env();

    std::env::set_var("RECOUNT_TARGET_ITEM", "unobtainium");
    assert!(RecountConfig::load().is_err());
    clear_env();
}
