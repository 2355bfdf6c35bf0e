//! Persisted CLI configuration (`config.toml` in the data directory).
//!
//! Only `current_course` is interpreted. Any other keys found in the file are
//! carried through untouched when the file is rewritten. When there is no
//! `config.toml` yet, `current_course` is picked up from a `config.json` left
//! in the same directory; the next save writes `config.toml`.

use crate::core::course::Course;
use crate::core::error::UlwaziError;
use crate::core::store::Store;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_course: Option<String>,
    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyConfig {
    #[serde(default)]
    current_course: Option<String>,
}

/// Load `config.toml`, falling back to `config.json`; no file is an empty config.
pub fn load_config(store: &Store) -> Result<Config, UlwaziError> {
    let path = store.config_path();
    if !path.exists() {
        return load_legacy_config(store);
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| {
        UlwaziError::ConfigError(format!("failed to parse {}: {}", path.display(), e))
    })
}

fn load_legacy_config(store: &Store) -> Result<Config, UlwaziError> {
    let path = store.legacy_config_path();
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&path)?;
    let legacy: LegacyConfig = serde_json::from_str(&content).map_err(|e| {
        UlwaziError::ConfigError(format!("failed to parse {}: {}", path.display(), e))
    })?;
    tracing::debug!(path = %path.display(), "read legacy json config");
    Ok(Config {
        current_course: legacy.current_course,
        ..Config::default()
    })
}

pub fn save_config(store: &Store, config: &Config) -> Result<(), UlwaziError> {
    fs::create_dir_all(&store.root)?;
    let body = toml::to_string(config)
        .map_err(|e| UlwaziError::ConfigError(format!("failed to serialize config: {}", e)))?;
    fs::write(store.config_path(), body)?;
    Ok(())
}

pub fn set_current_course(store: &Store, course: &Course) -> Result<(), UlwaziError> {
    let mut config = load_config(store)?;
    config.current_course = Some(course.as_str().to_string());
    save_config(store, &config)?;
    tracing::debug!(course = course.as_str(), "current course saved");
    Ok(())
}

pub fn current_course(store: &Store) -> Result<Option<Course>, UlwaziError> {
    load_config(store)?
        .current_course
        .as_deref()
        .map(Course::parse)
        .transpose()
}

/// The course a command works on: the explicit `--course` value if given,
/// otherwise the stored current course.
pub fn resolve_course(store: &Store, explicit: Option<&str>) -> Result<Course, UlwaziError> {
    match explicit {
        Some(raw) => Course::parse(raw),
        None => current_course(store)?.ok_or(UlwaziError::NoCourseSelected),
    }
}
