//! Configuration loading and session duration validation

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Session durations offered to clients: whole hours
pub const SESSION_HOURS: std::ops::RangeInclusive<u32> = 1..=12;

/// Interval durations offered to clients, in minutes
pub const INTERVAL_MINUTES: &[u32] = &[15, 20, 25, 30, 45, 60];

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("focusd");

        let socket_path = data_dir.join("daemon.sock");

        Ok(Self {
            socket_path,
            data_dir,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

/// Errors from session duration validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("session and interval durations must be greater than zero")]
    ZeroDuration,

    #[error("interval duration ({interval_secs}s) exceeds session duration ({session_secs}s)")]
    IntervalExceedsSession {
        interval_secs: u32,
        session_secs: u32,
    },

    #[error("session duration must be between 1 and 12 hours, got {0}")]
    HoursOutOfRange(u32),

    #[error("interval duration must be one of {INTERVAL_MINUTES:?} minutes, got {0}")]
    IntervalNotOffered(u32),
}

/// Durations for a focus session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Total session duration in seconds
    pub session_secs: u32,

    /// Duration of one check-in interval in seconds
    pub interval_secs: u32,
}

impl SessionConfig {
    /// Create a config from raw second counts
    pub fn new(session_secs: u32, interval_secs: u32) -> Result<Self, ConfigError> {
        let config = Self {
            session_secs,
            interval_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a config from the values presented to clients:
    /// whole hours for the session, a fixed set of minutes for the interval
    pub fn from_presented(session_hours: u32, interval_minutes: u32) -> Result<Self, ConfigError> {
        if !SESSION_HOURS.contains(&session_hours) {
            return Err(ConfigError::HoursOutOfRange(session_hours));
        }
        if !INTERVAL_MINUTES.contains(&interval_minutes) {
            return Err(ConfigError::IntervalNotOffered(interval_minutes));
        }
        Self::new(session_hours * 3600, interval_minutes * 60)
    }

    /// Check the core invariant: both durations positive, interval fits in session
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_secs == 0 || self.interval_secs == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        if self.interval_secs > self.session_secs {
            return Err(ConfigError::IntervalExceedsSession {
                interval_secs: self.interval_secs,
                session_secs: self.session_secs,
            });
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    /// One hour session with 25 minute intervals
    fn default() -> Self {
        Self {
            session_secs: 3600,
            interval_secs: 1500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load() {
        let config = Config::load().unwrap();
        assert!(config.socket_path.to_string_lossy().contains("focusd"));
    }

    #[test]
    fn test_default_session_config_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_interval_exceeding_session_rejected() {
        let err = SessionConfig::new(600, 1500).unwrap_err();
        assert!(matches!(err, ConfigError::IntervalExceedsSession { .. }));
    }

    #[test]
    fn test_zero_durations_rejected() {
        assert_eq!(
            SessionConfig::new(0, 1500).unwrap_err(),
            ConfigError::ZeroDuration
        );
        assert_eq!(
            SessionConfig::new(3600, 0).unwrap_err(),
            ConfigError::ZeroDuration
        );
    }

    #[test]
    fn test_from_presented() {
        let config = SessionConfig::from_presented(1, 25).unwrap();
        assert_eq!(config.session_secs, 3600);
        assert_eq!(config.interval_secs, 1500);

        assert!(matches!(
            SessionConfig::from_presented(13, 25),
            Err(ConfigError::HoursOutOfRange(13))
        ));
        assert!(matches!(
            SessionConfig::from_presented(1, 17),
            Err(ConfigError::IntervalNotOffered(17))
        ));
    }
}
