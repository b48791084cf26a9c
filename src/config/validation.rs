//! Configuration validation.
//!
//! Unlike [`EngineConfig::load`](super::EngineConfig::load), which stops at
//! the first problem, the validator collects every error and warning so the
//! `config validate` command can report them all at once.
//!
//! # Example
//!
//! ```rust,ignore
//! use goal_engine::config::ConfigValidator;
//!
//! let report = ConfigValidator::new(data_dir).validate();
//! if !report.is_valid() {
//!     for error in &report.errors {
//!         eprintln!("Error: {}", error);
//!     }
//!     std::process::exit(report.exit_code());
//! }
//! ```

use std::path::{Path, PathBuf};

use super::{ConfigFormat, EngineConfig};
use crate::tier::{Tier, MAX_LEAD_TIME_DAYS};

/// Top-level sections recognised in a config document.
const KNOWN_SECTIONS: [&str; 3] = ["policy", "consultation", "server"];

/// Consultations longer than this are probably a typo.
const LONG_CONSULTATION_MINUTES: u32 = 240;

/// Result of configuration validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Errors that make the configuration unusable.
    pub errors: Vec<String>,
    /// Suspicious values that are still accepted.
    pub warnings: Vec<String>,
    /// Config file that was checked, if one was found.
    pub file_checked: Option<PathBuf>,
}

impl ValidationReport {
    /// Create an empty (valid) report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no errors. Warnings do not affect validity.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns 0 if valid, 1 if invalid.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_valid() {
            0
        } else {
            1
        }
    }

    /// One-line summary of the result.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_valid() {
            if self.warnings.is_empty() {
                "Configuration is valid.".to_string()
            } else {
                format!(
                    "Configuration is valid with {} warning(s).",
                    self.warnings.len()
                )
            }
        } else {
            format!(
                "Configuration is invalid with {} error(s).",
                self.errors.len()
            )
        }
    }

    /// Multi-line report listing the checked file, errors and warnings.
    #[must_use]
    pub fn verbose_report(&self) -> String {
        let mut lines = vec![
            "Configuration Validation Report".to_string(),
            "\u{2500}".repeat(50),
        ];

        match &self.file_checked {
            Some(path) => lines.push(format!("File: {}", path.display())),
            None => lines.push("File: (none found, using defaults)".to_string()),
        }

        if !self.errors.is_empty() {
            lines.push(String::new());
            lines.push(format!("Errors ({}):", self.errors.len()));
            for error in &self.errors {
                lines.push(format!("  \u{2717} {}", error));
            }
        }

        if !self.warnings.is_empty() {
            lines.push(String::new());
            lines.push(format!("Warnings ({}):", self.warnings.len()));
            for warning in &self.warnings {
                lines.push(format!("  \u{26a0} {}", warning));
            }
        }

        lines.push(String::new());
        lines.push(format!("Status: {}", self.summary()));
        lines.join("\n")
    }
}

/// Validates an engine config file.
#[derive(Debug, Clone)]
pub struct ConfigValidator {
    data_dir: PathBuf,
    config_path: Option<PathBuf>,
}

impl ConfigValidator {
    /// Validate whatever config file `data_dir` contains.
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            config_path: None,
        }
    }

    /// Validate an explicit file instead of probing the data directory.
    #[must_use]
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Run every check and return the collected report.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();

        let path = match &self.config_path {
            Some(path) => Some(path.clone()),
            None => EngineConfig::locate(&self.data_dir),
        };
        let Some(path) = path else {
            return report;
        };
        report.file_checked = Some(path.clone());

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                report.errors.push(format!("Cannot read {}: {}", path.display(), e));
                return report;
            }
        };

        // Parse to a generic value first so unknown sections can be reported
        let value = match ConfigFormat::from_path(&path) {
            ConfigFormat::Json => serde_json::from_str::<serde_json::Value>(&content)
                .map_err(|e| format!("JSON syntax error: {e}")),
            ConfigFormat::Toml => toml::from_str::<toml::Table>(&content)
                .map_err(|e| format!("TOML syntax error: {e}"))
                .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
        };
        let value = match value {
            Ok(value) => value,
            Err(e) => {
                report.errors.push(e);
                return report;
            }
        };

        if let Some(sections) = value.as_object() {
            for key in sections.keys() {
                if !KNOWN_SECTIONS.contains(&key.as_str()) {
                    report
                        .warnings
                        .push(format!("Unknown section '{}' is ignored", key));
                }
            }
        }

        match serde_json::from_value::<EngineConfig>(value) {
            Ok(config) => check_values(&config, &mut report),
            Err(e) => report.errors.push(format!("Invalid field: {e}")),
        }

        report
    }
}

fn check_values(config: &EngineConfig, report: &mut ValidationReport) {
    let policy = &config.policy;
    if policy.min_lead_time_days < 0 {
        report
            .errors
            .push("policy.min_lead_time_days must not be negative".to_string());
    } else if policy.min_lead_time_days > MAX_LEAD_TIME_DAYS {
        report.errors.push(format!(
            "policy.min_lead_time_days must be at most {}",
            MAX_LEAD_TIME_DAYS
        ));
    } else if policy.min_lead_time_days == 0 {
        report
            .warnings
            .push("policy.min_lead_time_days is 0: consultations can be booked for right now".to_string());
    }
    if policy.consultation_min_tier == Tier::Explorer {
        report
            .warnings
            .push("policy.consultation_min_tier is explorer: every member can book consultations".to_string());
    }

    let minutes = config.consultation.default_duration_minutes;
    if minutes == 0 {
        report
            .errors
            .push("consultation.default_duration_minutes must be at least 1".to_string());
    } else if minutes > LONG_CONSULTATION_MINUTES {
        report.warnings.push(format!(
            "consultation.default_duration_minutes is {} (over {} minutes)",
            minutes, LONG_CONSULTATION_MINUTES
        ));
    }

    if let Err(e) = config.server.bind_addr() {
        report.errors.push(e.to_string());
    }
}
