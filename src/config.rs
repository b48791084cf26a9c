//! Engine configuration.
//!
//! Settings are read from `config.json` (or `config.toml`) inside the data
//! directory, or from an explicit path. Every field has a default, so a
//! missing file or a partial document is valid.
//!
//! ```json
//! {
//!   "policy": { "consultation_min_tier": "insider", "min_lead_time_days": 14 },
//!   "consultation": { "default_duration_minutes": 60 },
//!   "server": { "bind": "127.0.0.1:8300" }
//! }
//! ```

pub mod validation;

pub use validation::{ConfigValidator, ValidationReport};

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::consultation::ConsultationConfig;
use crate::error::{EngineError, Result};
use crate::tier::{TierPolicy, MAX_LEAD_TIME_DAYS};

/// Directory name under the platform data directory.
pub const DATA_DIR_NAME: &str = "goal-engine";

/// Config file names looked up in a data directory, in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["config.json", "config.toml"];

/// Default data directory: `<platform data dir>/goal-engine`.
///
/// Falls back to `./goal-engine` when the platform has no data directory.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// Serialization format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension. Anything but `.toml` is JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the server listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8300".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl ServerConfig {
    /// Parse the bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind.parse().map_err(|e| EngineError::InvalidConfig {
            field: "server.bind".to_string(),
            reason: format!("{}: {e}", self.bind),
        })
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub policy: TierPolicy,
    #[serde(default)]
    pub consultation: ConsultationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl EngineConfig {
    /// Parse a config document.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config: Self = match format {
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| EngineError::config(format!("invalid JSON config: {e}")))?,
            ConfigFormat::Toml => toml::from_str(content)
                .map_err(|e| EngineError::config(format!("invalid TOML config: {e}")))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::config_with_path(format!("cannot read config: {e}"), path.to_path_buf())
        })?;
        Self::parse(&content, ConfigFormat::from_path(path)).map_err(|e| match e {
            EngineError::Config { message, path: None } => EngineError::Config {
                message,
                path: Some(path.to_path_buf()),
            },
            other => other,
        })
    }

    /// First config file present in `data_dir`, if any.
    #[must_use]
    pub fn locate(data_dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| data_dir.join(name))
            .find(|p| p.exists())
    }

    /// Load the config from `data_dir`, or defaults when it has none.
    pub fn load_from_data_dir(data_dir: &Path) -> Result<Self> {
        match Self::locate(data_dir) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Check value ranges, failing on the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.policy.min_lead_time_days < 0 {
            return Err(EngineError::InvalidConfig {
                field: "policy.min_lead_time_days".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        if self.policy.min_lead_time_days > MAX_LEAD_TIME_DAYS {
            return Err(EngineError::InvalidConfig {
                field: "policy.min_lead_time_days".to_string(),
                reason: format!("must be at most {MAX_LEAD_TIME_DAYS}"),
            });
        }
        if self.consultation.default_duration_minutes == 0 {
            return Err(EngineError::InvalidConfig {
                field: "consultation.default_duration_minutes".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        self.server.bind_addr()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::Tier;
    use tempfile::TempDir;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            EngineConfig::parse(r#"{"policy": {"min_lead_time_days": 7}}"#, ConfigFormat::Json)
                .unwrap();
        assert_eq!(config.policy.min_lead_time_days, 7);
        assert_eq!(config.policy.consultation_min_tier, Tier::Insider);
        assert_eq!(config.consultation.default_duration_minutes, 60);
        assert_eq!(config.server.bind, "127.0.0.1:8300");
    }

    #[test]
    fn test_toml_config() {
        let content = r#"
[policy]
verified_task_min_tier = "visionary"

[consultation]
default_duration_minutes = 45
"#;
        let config = EngineConfig::parse(content, ConfigFormat::Toml).unwrap();
        assert_eq!(config.policy.verified_task_min_tier, Tier::Visionary);
        assert_eq!(config.consultation.default_duration_minutes, 45);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::parse(
            r#"{"consultation": {"default_duration_minutes": 0}}"#,
            ConfigFormat::Json,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));

        let err =
            EngineConfig::parse(r#"{"server": {"bind": "nowhere"}}"#, ConfigFormat::Json).unwrap_err();
        assert_eq!(err.code(), "config_error");
    }

    #[test]
    fn test_huge_lead_time_rejected() {
        let err = EngineConfig::parse(
            r#"{"policy": {"min_lead_time_days": 1000000000000000}}"#,
            ConfigFormat::Json,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { ref field, .. } if field == "policy.min_lead_time_days"));

        let config = EngineConfig::parse(
            &format!(r#"{{"policy": {{"min_lead_time_days": {MAX_LEAD_TIME_DAYS}}}}}"#),
            ConfigFormat::Json,
        )
        .unwrap();
        assert_eq!(config.policy.min_lead_time_days, MAX_LEAD_TIME_DAYS);
    }

    #[test]
    fn test_policy_tiers_use_backend_names() {
        let config =
            EngineConfig::parse("[policy]\nconsultation_min_tier = \"pro\"\n", ConfigFormat::Toml)
                .unwrap();
        assert_eq!(config.policy.consultation_min_tier, Tier::Insider);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a/config.TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a/config.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a/config")), ConfigFormat::Json);
    }

    #[test]
    fn test_load_from_empty_data_dir_is_default() {
        let temp = TempDir::new().unwrap();
        let config = EngineConfig::load_from_data_dir(temp.path()).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_from_data_dir_prefers_json() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("config.json"),
            r#"{"server": {"bind": "0.0.0.0:9000"}}"#,
        )
        .unwrap();
        std::fs::write(
            temp.path().join("config.toml"),
            "[server]\nbind = \"0.0.0.0:9001\"\n",
        )
        .unwrap();
        let config = EngineConfig::load_from_data_dir(temp.path()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn test_load_reports_path_on_syntax_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        match EngineConfig::load(&path).unwrap_err() {
            EngineError::Config { path: Some(p), .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
