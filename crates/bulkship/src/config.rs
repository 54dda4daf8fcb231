// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shipper configuration.
//!
//! Supports programmatic, TOML file, and environment-based configuration.
//! Values are read once at construction; a malformed server URL or an
//! unusable file log directory is a fatal construction-time error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix for environment-based configuration keys (`BULKSHIP_SERVER`, ...).
pub const ENV_PREFIX: &str = "BULKSHIP_";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Shipper configuration, immutable once the shipper is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipperConfig {
    /// Backend server URL (http/https). Trailing slashes are ignored.
    pub server: String,

    /// Flush automatically when the buffer reaches `buffer_threshold`.
    #[serde(default = "default_true")]
    pub auto_flush: bool,

    /// Buffer length that triggers an automatic flush (>= 1).
    #[serde(default = "default_buffer_threshold")]
    pub buffer_threshold: usize,

    /// Days before file logs are considered expired. Informational only;
    /// the shipper never deletes files itself.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Directory for file sink output.
    #[serde(default = "default_file_log_dir")]
    pub file_log_dir: PathBuf,

    /// strftime pattern used in file sink file names.
    #[serde(default = "default_date_pattern")]
    pub file_log_date_pattern: String,

    /// Optional strftime pattern appended to the index name in action lines.
    #[serde(default)]
    pub index_date_pattern: Option<String>,

    /// Master switch; when false, `log` calls are silently dropped.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Mirror flushed batches to local files.
    #[serde(default)]
    pub file_sink_enabled: bool,

    /// Emit debug-level diagnostics for serialize/flush steps.
    #[serde(default)]
    pub diagnostics: bool,
}

fn default_true() -> bool {
    true
}

fn default_buffer_threshold() -> usize {
    1
}

fn default_retention_days() -> u32 {
    7
}

fn default_file_log_dir() -> PathBuf {
    PathBuf::from("Storage")
}

fn default_date_pattern() -> String {
    "%Y%m%d".to_string()
}

impl ShipperConfig {
    /// Create a configuration with defaults for the given backend server.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            auto_flush: true,
            buffer_threshold: default_buffer_threshold(),
            retention_days: default_retention_days(),
            file_log_dir: default_file_log_dir(),
            file_log_date_pattern: default_date_pattern(),
            index_date_pattern: None,
            enabled: true,
            file_sink_enabled: false,
            diagnostics: false,
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from `BULKSHIP_*` environment variables.
    /// `BULKSHIP_SERVER` is required; boolean values accept `1` or `true`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server = lookup("SERVER")
            .ok_or_else(|| ConfigError::Invalid(format!("{}SERVER is not set", ENV_PREFIX)))?;

        let mut config = Self::new(server);
        if let Some(v) = lookup("AUTO_FLUSH") {
            config.auto_flush = parse_bool(&v);
        }
        if let Some(v) = lookup("BUFFER_THRESHOLD") {
            config.buffer_threshold = v
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("bad BUFFER_THRESHOLD: {}", v)))?;
        }
        if let Some(v) = lookup("RETENTION_DAYS") {
            config.retention_days = v
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("bad RETENTION_DAYS: {}", v)))?;
        }
        if let Some(v) = lookup("FILE_LOG_DIR") {
            config.file_log_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("FILE_LOG_DATE_PATTERN") {
            config.file_log_date_pattern = v;
        }
        if let Some(v) = lookup("INDEX_DATE_PATTERN") {
            config.index_date_pattern = Some(v);
        }
        if let Some(v) = lookup("ENABLED") {
            config.enabled = parse_bool(&v);
        }
        if let Some(v) = lookup("FILE_SINK_ENABLED") {
            config.file_sink_enabled = parse_bool(&v);
        }
        if let Some(v) = lookup("DIAGNOSTICS") {
            config.diagnostics = parse_bool(&v);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set auto-flush behavior.
    pub fn auto_flush(mut self, enabled: bool) -> Self {
        self.auto_flush = enabled;
        self
    }

    /// Set the automatic flush threshold.
    pub fn buffer_threshold(mut self, threshold: usize) -> Self {
        self.buffer_threshold = threshold;
        self
    }

    /// Set the file log retention hint.
    pub fn retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Set the file sink directory.
    pub fn file_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.file_log_dir = dir.into();
        self
    }

    /// Set the file name date pattern.
    pub fn file_log_date_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_log_date_pattern = pattern.into();
        self
    }

    /// Append a date suffix to index names using the given pattern.
    pub fn index_date_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.index_date_pattern = Some(pattern.into());
        self
    }

    /// Enable or disable the shipper entirely.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Enable or disable the file sink.
    pub fn file_sink_enabled(mut self, enabled: bool) -> Self {
        self.file_sink_enabled = enabled;
        self
    }

    /// Enable or disable debug diagnostics.
    pub fn diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// The server URL with trailing slashes stripped.
    pub fn server_base(&self) -> &str {
        self.server.trim_end_matches('/')
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_threshold < 1 {
            return Err(ConfigError::Invalid(
                "buffer_threshold must be at least 1".to_string(),
            ));
        }

        let base = self.server_base();
        let url = reqwest::Url::parse(base)
            .map_err(|e| ConfigError::Invalid(format!("bad server URL {:?}: {}", base, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Invalid(format!(
                "server URL must be http or https, got {:?}",
                url.scheme()
            )));
        }

        if crate::bulk::render_date(chrono::Local::now().date_naive(), &self.file_log_date_pattern)
            .is_none()
        {
            return Err(ConfigError::Invalid(format!(
                "bad file_log_date_pattern: {:?}",
                self.file_log_date_pattern
            )));
        }
        if let Some(pattern) = &self.index_date_pattern {
            if crate::bulk::render_date(chrono::Local::now().date_naive(), pattern).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "bad index_date_pattern: {:?}",
                    pattern
                )));
            }
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "True")
}
