use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// Base URL of the session backend, e.g. `http://localhost:8080`.
    /// When absent the dashboard runs against on-disk storage only.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Quiescence window for coalescing remote layout writes. Default: 800.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Per-request timeout for backend calls. Default: 10000.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Directory for the local layout store. Default: `<data dir>/paneboard`.
    #[serde(default)]
    pub storage_dir: Option<String>,
    /// Active modules used when no session can be read at all.
    #[serde(default = "default_modules")]
    pub default_modules: Vec<String>,
}

fn default_debounce_ms() -> u64 {
    800
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_modules() -> Vec<String> {
    vec!["SYSTEM-Status-default".to_string()]
}

impl Default for DashboardSettings {
    fn default() -> Self {
        DashboardSettings {
            api_base_url: None,
            debounce_ms: default_debounce_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            storage_dir: None,
            default_modules: default_modules(),
        }
    }
}

impl DashboardSettings {
    /// Parse settings from YAML text.
    pub fn from_yaml(text: &str) -> Result<DashboardSettings, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(DashboardSettings::default());
        }
        serde_yaml::from_str(text)
    }

    /// Load `config.yaml` from `config_dir`. Missing or malformed files give defaults.
    pub fn load(config_dir: &Path) -> DashboardSettings {
        let path = config_dir.join("config.yaml");
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => return DashboardSettings::default(),
        };
        match Self::from_yaml(&text) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed config");
                DashboardSettings::default()
            }
        }
    }

    /// Resolved directory for the local layout store.
    pub fn storage_path(&self) -> PathBuf {
        match &self.storage_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("paneboard"),
        }
    }
}
