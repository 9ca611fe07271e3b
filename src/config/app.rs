//! Main application configuration
//!
//! Defines the configuration structures for the squad-queue engine, with
//! defaults, environment variable overrides, TOML file loading, and
//! validation.

use anyhow::{anyhow, Result};
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub messaging: MessagingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// The three-stage time-offset model driving automated events.
///
/// For an event scheduled at time `T`, intake opens at `T - queue_open`,
/// the join deadline is `intake_open + joining`, and the scheduler forces
/// partitioning at `join_deadline + extension`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Minutes before the scheduled start that intake opens
    pub queue_open_minutes: i64,
    /// Minutes after intake opens that squads have to join
    pub joining_minutes: i64,
    /// Grace minutes past the join deadline while waiting for an exact
    /// room multiple
    pub extension_minutes: i64,
    /// Scheduler tick interval; must be much smaller than the smallest
    /// offset above
    pub tick_seconds: u64,
}

/// Outbound notification batching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingSettings {
    /// Maximum characters per coalesced chunk (platform ceiling is ~2000)
    pub max_chunk_chars: usize,
    /// Seconds between batcher flushes
    pub flush_interval_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "squad-queue".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            queue_open_minutes: 30,
            joining_minutes: 25,
            extension_minutes: 5,
            tick_seconds: 20,
        }
    }
}

impl Default for MessagingSettings {
    fn default() -> Self {
        Self {
            max_chunk_chars: 1500,
            flush_interval_seconds: 2,
        }
    }
}

impl ScheduleSettings {
    pub fn queue_open(&self) -> ChronoDuration {
        ChronoDuration::minutes(self.queue_open_minutes)
    }

    pub fn joining(&self) -> ChronoDuration {
        ChronoDuration::minutes(self.joining_minutes)
    }

    pub fn extension(&self) -> ChronoDuration {
        ChronoDuration::minutes(self.extension_minutes)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_seconds)
    }
}

impl MessagingSettings {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_seconds)
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to
    /// defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(minutes) = env::var("QUEUE_OPEN_MINUTES") {
            config.schedule.queue_open_minutes = minutes
                .parse()
                .map_err(|_| anyhow!("Invalid QUEUE_OPEN_MINUTES value: {}", minutes))?;
        }
        if let Ok(minutes) = env::var("JOINING_MINUTES") {
            config.schedule.joining_minutes = minutes
                .parse()
                .map_err(|_| anyhow!("Invalid JOINING_MINUTES value: {}", minutes))?;
        }
        if let Ok(minutes) = env::var("EXTENSION_MINUTES") {
            config.schedule.extension_minutes = minutes
                .parse()
                .map_err(|_| anyhow!("Invalid EXTENSION_MINUTES value: {}", minutes))?;
        }
        if let Ok(seconds) = env::var("TICK_SECONDS") {
            config.schedule.tick_seconds = seconds
                .parse()
                .map_err(|_| anyhow!("Invalid TICK_SECONDS value: {}", seconds))?;
        }
        if let Ok(chars) = env::var("MAX_CHUNK_CHARS") {
            config.messaging.max_chunk_chars = chars
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_CHUNK_CHARS value: {}", chars))?;
        }
        if let Ok(seconds) = env::var("FLUSH_INTERVAL_SECONDS") {
            config.messaging.flush_interval_seconds = seconds
                .parse()
                .map_err(|_| anyhow!("Invalid FLUSH_INTERVAL_SECONDS value: {}", seconds))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))?;
        validate_config(&config)?;
        Ok(config)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    let schedule = &config.schedule;
    if schedule.queue_open_minutes <= 0 {
        return Err(anyhow!("Queue-open offset must be greater than 0"));
    }
    if schedule.joining_minutes <= 0 {
        return Err(anyhow!("Joining offset must be greater than 0"));
    }
    if schedule.extension_minutes <= 0 {
        return Err(anyhow!("Extension offset must be greater than 0"));
    }
    if schedule.tick_seconds == 0 {
        return Err(anyhow!("Tick interval must be greater than 0"));
    }

    // The deadline pass only sees state at tick boundaries; a tick close to
    // the smallest offset would skip whole stages.
    let smallest_offset_seconds = 60
        * schedule
            .queue_open_minutes
            .min(schedule.joining_minutes)
            .min(schedule.extension_minutes) as u64;
    if schedule.tick_seconds * 3 > smallest_offset_seconds {
        return Err(anyhow!(
            "Tick interval ({}s) must be much smaller than the smallest time offset ({}s)",
            schedule.tick_seconds,
            smallest_offset_seconds
        ));
    }

    if config.messaging.max_chunk_chars == 0 || config.messaging.max_chunk_chars > 2000 {
        return Err(anyhow!(
            "Max chunk size must be between 1 and the platform ceiling of 2000"
        ));
    }
    if config.messaging.flush_interval_seconds == 0 {
        return Err(anyhow!("Flush interval must be greater than 0"));
    }

    Ok(())
}
