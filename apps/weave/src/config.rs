//! # Configuration
//!
//! Settings are resolved in this order, later wins:
//! 1. Built-in defaults
//! 2. `weave.toml` in the working directory, or the file passed with `--config`
//! 3. Environment: `WEAVE_LOOM`, `WEAVE_LOG_FORMAT`
//! 4. Command line flags (applied by the CLI)
//!
//! ```toml
//! loom = "weave-loom.json"
//! log_format = "json"
//!
//! [render]
//! width = 800
//! height = 600
//! spacing = 40
//! stroke = 3
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use weave_core::{RenderConfig, WeaveError};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "weave.toml";

/// Session file used when nothing else is configured.
pub const DEFAULT_LOOM_FILE: &str = "weave-loom.json";

/// Largest config file we are willing to parse (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = WeaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(WeaveError::InvalidArgument(format!(
                "unknown log format '{}' (expected text or json)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session file holding the loom snapshot.
    pub loom: PathBuf,
    pub log_format: LogFormat,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loom: PathBuf::from(DEFAULT_LOOM_FILE),
            log_format: LogFormat::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Config {
    /// Parse a TOML document. Missing keys take their defaults.
    ///
    /// The `[render]` table is validated here so that a bad canvas never
    /// reaches the renderer.
    pub fn from_toml(contents: &str) -> Result<Self, WeaveError> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| WeaveError::DeserializationError(format!("config: {}", e)))?;
        config.render.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Invalid values are ignored and described in the returned warnings.
    /// Tracing is not up yet when this runs, so the caller logs them.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        if let Some(loom) = lookup("WEAVE_LOOM").filter(|v| !v.is_empty()) {
            self.loom = PathBuf::from(loom);
        }
        if let Some(format) = lookup("WEAVE_LOG_FORMAT") {
            match format.parse() {
                Ok(f) => self.log_format = f,
                Err(e) => warnings.push(format!("ignoring WEAVE_LOG_FORMAT: {}", e)),
            }
        }
        warnings
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Vec<String> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }
}

/// A resolved configuration plus the overrides that were rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub config: Config,
    pub warnings: Vec<String>,
}

/// Load configuration from `explicit`, or from `weave.toml` if present.
///
/// An explicit path must exist; the implicit file is optional.
pub fn load(explicit: Option<&Path>) -> Result<Loaded, WeaveError> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        }
    };

    let mut config = match path {
        Some(path) => load_file(&path)?,
        None => Config::default(),
    };
    let warnings = config.apply_env_overrides();
    Ok(Loaded { config, warnings })
}

fn load_file(path: &Path) -> Result<Config, WeaveError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        WeaveError::IoError(format!("cannot read config {}: {}", path.display(), e))
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(WeaveError::InvalidArgument(format!(
            "config {} exceeds {} bytes",
            path.display(),
            MAX_CONFIG_FILE_SIZE
        )));
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        WeaveError::IoError(format!("cannot read config {}: {}", path.display(), e))
    })?;
    Config::from_toml(&contents)
}
