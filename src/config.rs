//! Server configuration.
//!
//! Defaults, then an optional JSON file named by `DOCPARSE_CONFIG`, then
//! environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Hard cap per uploaded file.
    pub max_file_size_bytes: usize,
    /// Files processed at once by the batch endpoint.
    pub batch_concurrency: usize,
    pub max_batch_files: usize,
    /// Applies to every completion call (cleanup and OCR).
    pub completion_timeout_secs: u64,
    pub model: String,
    pub vision_model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            max_file_size_bytes: 50 * MIB,
            batch_concurrency: 3,
            max_batch_files: 10,
            completion_timeout_secs: 60,
            model: "google/gemini-2.0-flash-001".to_string(),
            vision_model: "google/gemini-2.0-flash-001".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `DOCPARSE_CONFIG` (if set) and the process environment.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("DOCPARSE_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Apply overrides from a key lookup (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("DOCPARSE_BIND") {
            self.bind_addr = bind;
        }
        if let Some(mb) = lookup("DOCPARSE_MAX_FILE_MB") {
            let mb: usize = parse_number("DOCPARSE_MAX_FILE_MB", &mb)?;
            self.max_file_size_bytes = mb * MIB;
        }
        if let Some(n) = lookup("DOCPARSE_BATCH_CONCURRENCY") {
            self.batch_concurrency = parse_number("DOCPARSE_BATCH_CONCURRENCY", &n)?;
        }
        if let Some(secs) = lookup("DOCPARSE_COMPLETION_TIMEOUT_SECS") {
            self.completion_timeout_secs = parse_number("DOCPARSE_COMPLETION_TIMEOUT_SECS", &secs)?;
        }
        if let Some(model) = lookup("OPENROUTER_MODEL") {
            self.model = model;
        }
        if let Some(model) = lookup("OPENROUTER_VISION_MODEL") {
            self.vision_model = model;
        }

        if self.batch_concurrency == 0 {
            anyhow::bail!("batch_concurrency must be at least 1");
        }
        Ok(())
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.max_file_size_bytes, 52_428_800);
        assert_eq!(config.batch_concurrency, 3);
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"batch_concurrency": 5}"#).unwrap();
        assert_eq!(config.batch_concurrency, 5);
        assert_eq!(config.completion_timeout_secs, 60);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(lookup(&[
                ("DOCPARSE_BIND", "127.0.0.1:8080"),
                ("DOCPARSE_MAX_FILE_MB", "10"),
                ("OPENROUTER_VISION_MODEL", "vision/model"),
            ]))
            .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.max_file_size_bytes, 10 * MIB);
        assert_eq!(config.vision_model, "vision/model");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(lookup(&[("DOCPARSE_BATCH_CONCURRENCY", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("DOCPARSE_BATCH_CONCURRENCY"));

        let mut config = AppConfig::default();
        assert!(config
            .apply_overrides(lookup(&[("DOCPARSE_BATCH_CONCURRENCY", "0")]))
            .is_err());
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = AppConfig::from_file(Path::new("/nonexistent/docparse.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
