// src/config.rs
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::extract::portals::PortalRegistry;
use crate::notify::WebhookFlavor;

pub const ENV_CONFIG_PATH: &str = "ADVERT_NOTIFIER_CONFIG";
pub const ENV_WEBHOOK_URL: &str = "ADVERT_NOTIFIER_WEBHOOK_URL";
const FALLBACK_PATHS: [&str; 3] = [
    "config/notifier.toml",
    "config/notifier.yaml",
    "config/notifier.json",
];

/// Process-wide settings, loaded once at startup and never mutated.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_path: PathBuf,
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default)]
    pub webhook_flavor: WebhookFlavor,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// portal -> ordered targets
    pub filters: BTreeMap<String, Vec<String>>,
}

fn default_timeout_secs() -> u64 {
    30
}

/// One portal and the pages to scan under its rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub portal: String,
    pub targets: Vec<String>,
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Sources in portal-name order; targets keep their configured order.
    pub fn sources(&self) -> Vec<SourceConfig> {
        self.filters
            .iter()
            .map(|(portal, targets)| SourceConfig {
                portal: portal.clone(),
                targets: targets.iter().map(|t| t.trim().to_string()).collect(),
            })
            .collect()
    }

    pub fn validate(&self, registry: &PortalRegistry) -> Result<(), ConfigError> {
        if self.webhook_url.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "webhook_url is empty (set it in the file or via {ENV_WEBHOOK_URL})"
            )));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database_path is empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.filters.is_empty() {
            return Err(ConfigError::Invalid("filters has no portals".into()));
        }
        for (portal, targets) in &self.filters {
            if !registry.contains(portal) {
                let known: Vec<_> = registry.names().collect();
                return Err(ConfigError::Invalid(format!(
                    "unknown portal {portal:?} (known: {})",
                    known.join(", ")
                )));
            }
            for target in targets.iter().map(|t| t.trim()) {
                if target.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "portal {portal:?} has an empty target"
                    )));
                }
                if let Err(e) = reqwest::Url::parse(target) {
                    return Err(ConfigError::Invalid(format!(
                        "portal {portal:?} target {target:?} is not a URL: {e}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Load config from an explicit path. Supports TOML, YAML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str()).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Pick the config file:
/// 1) explicit path (`--config`)
/// 2) $ADVERT_NOTIFIER_CONFIG
/// 3) config/notifier.toml
/// 4) config/notifier.yaml
/// 5) config/notifier.json
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        return Ok(PathBuf::from(p));
    }
    FALLBACK_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| ConfigError::NotFound {
            tried: format!("${ENV_CONFIG_PATH}, {}", FALLBACK_PATHS.join(", ")),
        })
}

/// Resolve, read and parse the config, then apply environment overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = resolve_config_path(explicit)?;
    let mut cfg = load_config_from(&path)?;
    if let Ok(url) = std::env::var(ENV_WEBHOOK_URL) {
        if !url.trim().is_empty() {
            cfg.webhook_url = url.trim().to_string();
        }
    }
    tracing::debug!(path = %path.display(), portals = cfg.filters.len(), "config loaded");
    Ok(cfg)
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig, String> {
    let try_json_first = hint_ext == "json" || s.trim_start().starts_with('{');
    if try_json_first {
        return serde_json::from_str(s).map_err(|e| e.to_string());
    }
    if matches!(hint_ext, "yaml" | "yml") {
        return serde_yaml::from_str(s).map_err(|e| e.to_string());
    }
    toml::from_str(s).map_err(|e| e.to_string())
}
