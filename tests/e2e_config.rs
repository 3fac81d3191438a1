//! E2E tests for persistent configuration
//!
//! Tests that a config written by the binary can be read back and drives a
//! working pipeline, and that broken files fall back to defaults.

use clapsense::config::AppConfig;
use clapsense::{ClapPipeline, DetectorConfig};

#[test]
fn test_saved_config_builds_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clapsense").join("config.json");

    let mut config = AppConfig {
        device: Some("USB Audio Device".to_string()),
        detector: DetectorConfig::with_sample_count(1024),
    };
    config.detector.threshold = 42.0;
    config.detector.gesture_window_us = 750_000;
    config.save(&path).unwrap();

    let loaded = AppConfig::load_from(&path);
    assert_eq!(loaded, config);

    let pipeline = ClapPipeline::new(loaded.detector).unwrap();
    assert_eq!(pipeline.config().sample_count, 1024);
    assert_eq!(pipeline.config().band_split, 102);
    assert_eq!(pipeline.sequence().window_us(), 750_000);
}

#[test]
fn test_hand_written_config_with_level_scale() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "detector": {
                "level_scale": "decibel",
                "threshold": 22.0,
                "amplitude_threshold": 500
            }
        }"#,
    )
    .unwrap();

    let config = AppConfig::load_from(&path);
    assert_eq!(config.device, None);
    assert_eq!(config.detector.level_scale, clapsense_core::LevelScale::Decibel);
    assert_eq!(config.detector.threshold, 22.0);
    assert_eq!(config.detector.amplitude_threshold, 500);
    assert_eq!(config.detector.sample_count, clapsense::DEFAULT_SAMPLE_COUNT);
    assert!(ClapPipeline::new(config.detector).is_ok());
}

#[test]
fn test_out_of_range_detector_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"detector": {"band_split": 4096}}"#).unwrap();

    let config = AppConfig::load_from(&path);
    assert_eq!(config.detector, DetectorConfig::default());
}

#[test]
fn test_saved_file_is_pretty_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    AppConfig::default().save(&path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("\n"));
    assert!(contents.contains("\"natural_log\""));
    assert!(contents.contains("\"gesture_window_us\": 1000000"));
}
