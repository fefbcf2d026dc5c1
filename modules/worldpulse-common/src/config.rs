use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{Result, WorldPulseError};

// ---------------------------------------------------------------------------
// File config (TOML): pipeline knobs. Every section is optional.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub pipeline: PipelineConfig,
    pub retries: RetryConfig,
    pub highlight: HighlightConfig,
    pub history: HistoryConfig,
    pub world: WorldConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Paint per-country results as they land instead of one batch call.
    pub progressive: bool,
    /// Upper bound on keys requested per run.
    pub max_countries: usize,
    /// Simultaneous per-country requests.
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            progressive: true,
            max_countries: 100,
            concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
}

impl RetrySettings {
    pub const fn new(max_retries: u32, base_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            base_backoff_ms,
        }
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub country: RetrySettings,
    pub batch: RetrySettings,
    pub countries: RetrySettings,
    pub world: RetrySettings,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            country: RetrySettings::new(3, 600),
            batch: RetrySettings::new(3, 700),
            countries: RetrySettings::new(1, 300),
            world: RetrySettings::new(1, 400),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlightConfig {
    pub click_ms: u64,
    pub fly_to_ms: u64,
    pub default_ms: u64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            click_ms: 1800,
            fly_to_ms: 2600,
            default_ms: 2400,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_entries: 15 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// GeoJSON sources, tried in order.
    pub sources: Vec<String>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                "https://raw.githubusercontent.com/holtzy/D3-graph-gallery/master/DATA/world.geojson"
                    .to_string(),
                "https://raw.githubusercontent.com/johan/world.geo.json/master/countries.geo.json"
                    .to_string(),
            ],
        }
    }
}

impl FileConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| WorldPulseError::Config(e.to_string()))
    }

    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WorldPulseError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            WorldPulseError::Config(format!("Failed to parse config file {}: {e}", path.display()))
        })
    }
}

// ---------------------------------------------------------------------------
// Env config: endpoint and local paths.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    /// Where topic history and bookmarks persist. In-memory when unset.
    pub state_file: Option<PathBuf>,
    /// Per-request HTTP timeout. None leaves requests unbounded.
    pub request_timeout: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("WORLDPULSE_API_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                WorldPulseError::Config(
                    "WORLDPULSE_API_URL environment variable is required".to_string(),
                )
            })?;

        let request_timeout = match lookup("WORLDPULSE_REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    WorldPulseError::Config(format!(
                        "WORLDPULSE_REQUEST_TIMEOUT_SECS must be a number, got {raw:?}"
                    ))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            state_file: lookup("WORLDPULSE_STATE_FILE").map(PathBuf::from),
            request_timeout,
        })
    }

    fn log_keys(&self) {
        info!(
            api_url = %self.api_url,
            state_file = ?self.state_file,
            request_timeout_secs = ?self.request_timeout.map(|d| d.as_secs()),
            "Loaded WorldPulse config"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = FileConfig::from_toml_str("").unwrap();
        assert!(config.pipeline.progressive);
        assert_eq!(config.pipeline.max_countries, 100);
        assert_eq!(config.pipeline.concurrency, 8);
        assert_eq!(config.retries.country, RetrySettings::new(3, 600));
        assert_eq!(config.retries.countries, RetrySettings::new(1, 300));
        assert_eq!(config.history.max_entries, 15);
        assert_eq!(config.world.sources.len(), 2);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = FileConfig::from_toml_str(
            r#"
            [pipeline]
            concurrency = 2

            [retries.batch]
            max_retries = 0
            base_backoff_ms = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.pipeline.concurrency, 2);
        assert_eq!(config.pipeline.max_countries, 100);
        assert_eq!(config.retries.batch, RetrySettings::new(0, 50));
        assert_eq!(config.retries.country, RetrySettings::new(3, 600));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = FileConfig::from_toml_str("[pipeline]\nparallelism = 3\n").unwrap_err();
        assert!(matches!(err, WorldPulseError::Config(_)));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[highlight]\nclick_ms = 10").unwrap();
        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.highlight.click_ms, 10);
        assert_eq!(config.highlight.fly_to_ms, 2600);
    }

    #[test]
    fn app_config_requires_api_url() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, WorldPulseError::Config(_)));
    }

    #[test]
    fn app_config_parses_optional_values() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("WORLDPULSE_API_URL", "http://localhost:8080/"),
            ("WORLDPULSE_STATE_FILE", "/tmp/wp.json"),
            ("WORLDPULSE_REQUEST_TIMEOUT_SECS", "45"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.state_file, Some(PathBuf::from("/tmp/wp.json")));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(45)));
    }

    #[test]
    fn app_config_rejects_bad_timeout() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("WORLDPULSE_API_URL", "http://localhost:8080"),
            ("WORLDPULSE_REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, WorldPulseError::Config(_)));
    }
}
