use std::path::{Path, PathBuf};
use std::time::Duration;

use layers::HighlightConfig;
use plot::{PlotLayout, ViewportApprox};
use serde::{Deserialize, Serialize};
use store::ingest::GEO_TYPES;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub plot: PlotLayout,
    pub highlight: HighlightConfig,
    pub viewport: ViewportApprox,
    /// How long to wait for the map to finish rendering before reading
    /// features of a freshly shown layer.
    pub map_idle_timeout_ms: u64,
    /// Layer names recognised as geography sources.
    pub geo_types: Vec<String>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            plot: PlotLayout::default(),
            highlight: HighlightConfig::default(),
            viewport: ViewportApprox::default(),
            map_idle_timeout_ms: 4000,
            geo_types: GEO_TYPES.iter().map(|g| g.to_string()).collect(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse {
                path: Some(path),
                source,
            } => write!(f, "invalid config {}: {source}", path.display()),
            ConfigError::Parse { path: None, source } => write!(f, "invalid config: {source}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl ExplorerConfig {
    /// Defaults, then `path` if given, then `NEXUS_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: Some(path.to_path_buf()),
                    source,
                })?
            }
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse { path: None, source })
    }

    /// Applies overrides from `lookup`; unset or unparseable keys keep the
    /// current value.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.highlight.leave_delay_ms =
            env_var_u64(&lookup, "NEXUS_LEAVE_DELAY_MS", self.highlight.leave_delay_ms);
        self.viewport.tile_span = env_var_f64(&lookup, "NEXUS_TILE_SPAN", self.viewport.tile_span);
        self.viewport.lat_aspect =
            env_var_f64(&lookup, "NEXUS_LAT_ASPECT", self.viewport.lat_aspect);
        self.plot.width = env_var_f64(&lookup, "NEXUS_PLOT_WIDTH", self.plot.width);
        self.plot.height = env_var_f64(&lookup, "NEXUS_PLOT_HEIGHT", self.plot.height);
        self.map_idle_timeout_ms =
            env_var_u64(&lookup, "NEXUS_IDLE_TIMEOUT_MS", self.map_idle_timeout_ms);
        if let Some(list) = env_var_list(&lookup, "NEXUS_GEO_TYPES") {
            self.geo_types = list;
        }
    }

    pub fn map_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.map_idle_timeout_ms)
    }
}

fn env_var_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_var_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .filter(|v: &f64| v.is_finite())
        .unwrap_or(default)
}

/// Comma-separated, blanks dropped; an empty list counts as unset.
fn env_var_list(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Vec<String>> {
    let list: Vec<String> = lookup(key)?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!list.is_empty()).then_some(list)
}
