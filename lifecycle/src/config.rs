//! Engine configuration
//!
//! Loaded from a TOML file, from environment variables, or both
//! (`from_file` followed by `apply_env`). Every entry point validates the
//! result before handing it to the service.
//!
//! ```toml
//! event_capacity = 512
//! max_reason_len = 500
//!
//! [sla]
//! critical_hours = 2
//! high_hours = 6
//! medium_hours = 24
//! low_hours = 96
//! response_percent = 10
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sla::SlaPolicy;

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Configuration for [`WorkOrderService`](crate::service::WorkOrderService)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SLA budgets applied at intake and on escalation
    pub sla: SlaPolicy,
    /// Broadcast buffer size for lifecycle events
    pub event_capacity: usize,
    /// Longest accepted transition/escalation reason or assignment note
    pub max_reason_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sla: SlaPolicy::default(),
            event_capacity: 256,
            max_reason_len: 1000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `WORKORDER_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `WORKORDER_*` overrides; unparseable values are ignored
    pub fn apply_env(&mut self) {
        fn read<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok()?.trim().parse().ok()
        }

        if let Some(hours) = read("WORKORDER_SLA_CRITICAL_HOURS") {
            self.sla.critical_hours = hours;
        }
        if let Some(hours) = read("WORKORDER_SLA_HIGH_HOURS") {
            self.sla.high_hours = hours;
        }
        if let Some(hours) = read("WORKORDER_SLA_MEDIUM_HOURS") {
            self.sla.medium_hours = hours;
        }
        if let Some(hours) = read("WORKORDER_SLA_LOW_HOURS") {
            self.sla.low_hours = hours;
        }
        if let Some(percent) = read("WORKORDER_RESPONSE_PERCENT") {
            self.sla.response_percent = percent;
        }
        if let Some(capacity) = read("WORKORDER_EVENT_CAPACITY") {
            self.event_capacity = capacity;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sla.validate()?;
        if self.event_capacity == 0 {
            return Err(ConfigError::invalid("event_capacity must be at least 1"));
        }
        if self.max_reason_len == 0 {
            return Err(ConfigError::invalid("max_reason_len must be at least 1"));
        }
        Ok(())
    }
}
