use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TollgateConfig {
    #[serde(default)]
    pub access_log: AccessLogConfig,
}

/// Access-log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Destination file. Lines go to stdout when unset.
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    /// Size that triggers rotation. 0 = never rotate.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Rotated files to keep. 0 = unlimited.
    #[serde(default = "default_max_rotated_files")]
    pub max_rotated_files: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Common,
    Json,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_max_file_size() -> u64 { 100 * 1024 * 1024 }
fn default_max_rotated_files() -> usize { 30 }

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Common,
            file_path: None,
            max_file_size_bytes: default_max_file_size(),
            max_rotated_files: default_max_rotated_files(),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "common" => Ok(LogFormat::Common),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown access log format: {other}")),
        }
    }
}

impl TollgateConfig {
    /// Load configuration from YAML file + env overrides.
    ///
    /// Env keys nest on `__`, e.g. `TOLLGATE_ACCESS_LOG__FORMAT=json`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: TollgateConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("TOLLGATE_").split("__"))
            .extract()?;
        Ok(config)
    }
}
