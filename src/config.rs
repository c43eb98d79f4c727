//! Runtime configuration for the orchestration engine.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors returned when a configuration cannot drive the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The scheduler tick interval is zero.
    #[error("scheduler tick interval must be at least one second")]
    ZeroTickInterval,

    /// The UTC offset is outside the representable range.
    #[error("invalid UTC offset {0} seconds, expected a value within +/- 86399")]
    InvalidUtcOffset(i32),

    /// The per-host gateway concurrency is zero.
    #[error("max concurrent gateway calls per host must be at least one")]
    ZeroHostConcurrency,

    /// The trigger channel capacity is zero.
    #[error("trigger channel capacity must be at least one")]
    ZeroChannelCapacity,
}

/// Orchestrator settings.
///
/// All fields have defaults, so a partial document deserializes cleanly.
///
/// # Examples
///
/// ```
/// use strongroom::config::OrchestratorConfig;
///
/// let config = OrchestratorConfig::default();
/// assert_eq!(config.tick_interval_secs, 30);
/// assert!(config.validate().is_ok());
///
/// let parsed: OrchestratorConfig =
///     serde_json::from_str(r#"{"utc_offset_seconds": 25200}"#).expect("valid config");
/// assert_eq!(parsed.utc_offset_seconds, 25200);
/// assert_eq!(parsed.max_concurrent_per_host, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Seconds between scheduler ticks.
    pub tick_interval_secs: u64,
    /// Largest number of elapsed minutes one tick will evaluate after a stall.
    pub max_catch_up_minutes: u32,
    /// Effective timezone for cron evaluation, as seconds east of UTC.
    pub utc_offset_seconds: i32,
    /// Upper bound for a single hypervisor gateway call.
    pub gateway_timeout_secs: u64,
    /// Concurrent gateway calls allowed against one host address.
    pub max_concurrent_per_host: usize,
    /// Buffered scheduler triggers awaiting dispatch.
    pub trigger_channel_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 30,
            max_catch_up_minutes: 5,
            utc_offset_seconds: 0,
            gateway_timeout_secs: 2 * 60 * 60,
            max_concurrent_per_host: 1,
            trigger_channel_capacity: 64,
        }
    }
}

impl OrchestratorConfig {
    /// Creates a configuration with short intervals for local runs and tests.
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            tick_interval_secs: 1,
            max_catch_up_minutes: 1,
            utc_offset_seconds: 0,
            gateway_timeout_secs: 30,
            max_concurrent_per_host: 4,
            trigger_channel_capacity: 16,
        }
    }

    /// Returns a copy using the given UTC offset for cron evaluation.
    #[must_use]
    pub const fn with_utc_offset_seconds(mut self, seconds: i32) -> Self {
        self.utc_offset_seconds = seconds;
        self
    }

    /// Returns a copy with the given gateway timeout.
    #[must_use]
    pub const fn with_gateway_timeout_secs(mut self, seconds: u64) -> Self {
        self.gateway_timeout_secs = seconds;
        self
    }

    /// Checks that every setting can drive the engine.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_secs == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.max_concurrent_per_host == 0 {
            return Err(ConfigError::ZeroHostConcurrency);
        }
        if self.trigger_channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }
        self.timezone().map(|_| ())
    }

    /// Returns the scheduler tick interval.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Returns the gateway call timeout.
    #[must_use]
    pub const fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Returns the effective timezone for cron evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUtcOffset`] when the offset is out of
    /// range.
    pub fn timezone(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_seconds)
            .ok_or(ConfigError::InvalidUtcOffset(self.utc_offset_seconds))
    }
}
