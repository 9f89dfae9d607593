/*!
 * Tests for application configuration
 */

use std::fs;
use anyhow::Result;

use vidsqueeze::app_config::{Config, LogLevel, TranslationProvider};
use vidsqueeze::translation::DEFAULT_CONCURRENCY;
use crate::common;

/// A missing config file is created with defaults
#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config, Config::default());
    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(written["encoder"]["ffmpeg_path"], "ffmpeg");
    assert_eq!(written["translation"]["provider"], "google");
    Ok(())
}

/// Saved changes are loaded back
#[test]
fn test_save_thenLoad_shouldKeepChanges() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = Config::default();
    config.target_language = "ja".to_string();
    config.encoder.max_parallel_jobs = 2;
    config.translation.provider = TranslationProvider::Echo;
    config.log_level = LogLevel::Debug;
    config.save(&path)?;

    let loaded = Config::load_or_create(&path)?;
    assert_eq!(loaded, config);
    Ok(())
}

/// Unknown keys are ignored and missing ones take defaults
#[test]
fn test_load_or_create_withPartialFile_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{ "target_language": "es", "encoder": { "preset": "veryfast" }, "legacy": true }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.target_language, "es");
    assert_eq!(config.source_language, "en");
    assert_eq!(config.encoder.preset, "veryfast");
    assert_eq!(config.encoder.video_codec, "libx264");
    assert_eq!(config.translation.concurrent_requests, DEFAULT_CONCURRENCY);
    config.validate()?;
    Ok(())
}

/// Broken JSON is an error, not a silent reset
#[test]
fn test_load_or_create_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;
    assert!(Config::load_or_create(&path).is_err());
    assert_eq!(fs::read_to_string(&path)?, "{ not json");
    Ok(())
}

/// Validation rejects settings the tools cannot work with
#[test]
fn test_validate_withBadSettings_shouldFail() {
    let mut config = Config::default();
    config.encoder.audio_bitrate_kbps = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.encoder.ffprobe_path = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.endpoint = "not a url".to_string();
    assert!(config.validate().is_err());

    // the endpoint is irrelevant offline
    config.translation.provider = TranslationProvider::Echo;
    assert!(config.validate().is_ok());
}
