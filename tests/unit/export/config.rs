use std::collections::HashMap;

use super::*;
use crate::compose::plan::{ConcatMode, MaskInput};

#[test]
fn defaults() {
    let cfg = ExportConfig::default();
    assert_eq!(cfg.engine_sources, vec!["ffmpeg"]);
    assert_eq!(cfg.max_init_attempts, 3);
    assert!(cfg.validate().is_ok());
}

#[test]
fn env_overlay_ignores_garbage() {
    let vars: HashMap<&str, &str> = [
        ("CLIPFORGE_ENGINE_SOURCES", " /opt/ffmpeg , ffmpeg ,,"),
        ("CLIPFORGE_INIT_ATTEMPTS", "5"),
        ("CLIPFORGE_INIT_BACKOFF_MS", "nope"),
    ]
    .into_iter()
    .collect();
    let cfg = ExportConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
    assert_eq!(cfg.engine_sources, vec!["/opt/ffmpeg", "ffmpeg"]);
    assert_eq!(cfg.max_init_attempts, 5);
    assert_eq!(cfg.init_backoff_ms, 250);
}

#[test]
fn json_document_with_partial_fields() {
    let json = r#"{
        "max_init_attempts": 2,
        "plan": { "concat": "reencode", "mask_input": "png" },
        "progress": { "staging_end": 5 }
    }"#;
    let cfg = ExportConfig::from_json_reader(json.as_bytes()).unwrap();
    assert_eq!(cfg.max_init_attempts, 2);
    assert_eq!(cfg.plan.concat, ConcatMode::Reencode);
    assert_eq!(cfg.plan.mask_input, MaskInput::Png);
    assert_eq!(cfg.progress.staging_end, 5.0);
    assert_eq!(cfg.progress.executing_end, 90.0);

    assert!(ExportConfig::from_json_reader(r#"{"max_init_attempts": 0}"#.as_bytes()).is_err());
    assert!(ExportConfig::from_json_reader("{".as_bytes()).is_err());
}

#[test]
fn backoff_doubles_up_to_cap() {
    let cfg = ExportConfig::default();
    let delays: Vec<u64> = (0..5).map(|a| cfg.backoff(a).as_millis() as u64).collect();
    assert_eq!(delays, vec![250, 500, 1000, 2000, 2000]);
    assert_eq!(cfg.backoff(80).as_millis(), 2000);
}

#[test]
fn progress_bands_map_linearly() {
    let bands = ProgressBands::default();
    assert_eq!(bands.staging(1, 2), 5.0);
    assert_eq!(bands.executing(0, 4), 10.0);
    assert_eq!(bands.executing(2, 4), 50.0);
    assert_eq!(bands.executing(4, 4), 90.0);
    assert_eq!(bands.executing(0, 0), 90.0);
}
