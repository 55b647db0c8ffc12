//! Tunables for the pull request monitor and the periodic sync worker.
//!
//! Both configurations deserialize from partial JSON documents: absent
//! fields keep their defaults. Durations are expressed in whole seconds on
//! the wire.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating sync configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document is not valid JSON for this schema.
    #[error("failed to parse sync configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the services cannot run with.
    #[error("invalid sync configuration: {field} {reason}")]
    Invalid {
        /// Offending field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

fn ensure_positive_duration(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero",
        });
    }
    Ok(())
}

fn ensure_positive_count(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be at least one",
        });
    }
    Ok(())
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Configuration for per-pull-request monitoring sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Delay between successful polls of one pull request.
    #[serde(rename = "poll_interval_secs", with = "seconds")]
    pub poll_interval: Duration,
    /// Consecutive failed fetches after which a session is abandoned.
    pub max_retries: u32,
    /// Delay before polling again after a failed fetch.
    #[serde(rename = "retry_delay_secs", with = "seconds")]
    pub retry_delay: Duration,
    /// Deadline for a single remote fetch.
    #[serde(rename = "fetch_timeout_secs", with = "seconds")]
    pub fetch_timeout: Duration,
    /// Longest time [`crate::sync::monitor::PrMonitor::stop`] waits for
    /// polling loops to exit.
    #[serde(rename = "stop_timeout_secs", with = "seconds")]
    pub stop_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5 * 60),
            max_retries: 3,
            retry_delay: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(30),
            stop_timeout: Duration::from_secs(10),
        }
    }
}

impl MonitorConfig {
    /// Sets the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the consecutive-failure bound.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the delay after a failed fetch.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Sets the per-fetch deadline.
    #[must_use]
    pub const fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Sets the bounded wait used when stopping.
    #[must_use]
    pub const fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero intervals or a zero retry
    /// bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive_duration("poll_interval_secs", self.poll_interval)?;
        ensure_positive_duration("fetch_timeout_secs", self.fetch_timeout)?;
        ensure_positive_duration("stop_timeout_secs", self.stop_timeout)?;
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid {
                field: "max_retries",
                reason: "must be at least one",
            });
        }
        Ok(())
    }
}

/// Configuration for the periodic batch sync worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncWorkerConfig {
    /// Delay between the end of one cycle and the start of the next.
    #[serde(rename = "sync_interval_secs", with = "seconds")]
    pub sync_interval: Duration,
    /// Number of pull requests grouped into one batch.
    pub batch_size: usize,
    /// Upper bound on per-pull-request syncs in flight across a cycle.
    pub max_concurrent_syncs: usize,
    /// Deadline for a single remote fetch.
    #[serde(rename = "sync_timeout_secs", with = "seconds")]
    pub sync_timeout: Duration,
    /// Fetch attempts per pull request per cycle.
    pub retry_attempts: u32,
    /// Delay between fetch attempts.
    #[serde(rename = "retry_delay_secs", with = "seconds")]
    pub retry_delay: Duration,
    /// Deadline for a whole cycle.
    #[serde(rename = "cycle_timeout_secs", with = "seconds")]
    pub cycle_timeout: Duration,
}

impl Default for SyncWorkerConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(60),
            batch_size: 10,
            max_concurrent_syncs: 5,
            sync_timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(10),
            cycle_timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl SyncWorkerConfig {
    /// Sets the interval between cycles.
    #[must_use]
    pub const fn with_sync_interval(mut self, sync_interval: Duration) -> Self {
        self.sync_interval = sync_interval;
        self
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the concurrency bound.
    #[must_use]
    pub const fn with_max_concurrent_syncs(mut self, max_concurrent_syncs: usize) -> Self {
        self.max_concurrent_syncs = max_concurrent_syncs;
        self
    }

    /// Sets the per-fetch deadline.
    #[must_use]
    pub const fn with_sync_timeout(mut self, sync_timeout: Duration) -> Self {
        self.sync_timeout = sync_timeout;
        self
    }

    /// Sets the number of fetch attempts.
    #[must_use]
    pub const fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    /// Sets the delay between fetch attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Sets the whole-cycle deadline.
    #[must_use]
    pub const fn with_cycle_timeout(mut self, cycle_timeout: Duration) -> Self {
        self.cycle_timeout = cycle_timeout;
        self
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero intervals, batch sizes,
    /// concurrency, or attempts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive_duration("sync_interval_secs", self.sync_interval)?;
        ensure_positive_duration("sync_timeout_secs", self.sync_timeout)?;
        ensure_positive_duration("cycle_timeout_secs", self.cycle_timeout)?;
        ensure_positive_count("batch_size", self.batch_size)?;
        ensure_positive_count("max_concurrent_syncs", self.max_concurrent_syncs)?;
        if self.retry_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "retry_attempts",
                reason: "must be at least one",
            });
        }
        Ok(())
    }
}

/// Combined configuration for both reconciliation paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Real-time monitor settings.
    pub monitor: MonitorConfig,
    /// Periodic worker settings.
    pub worker: SyncWorkerConfig,
}

impl SyncConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for unusable values.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.monitor.validate()?;
        config.worker.validate()?;
        Ok(config)
    }
}
