use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Process configuration. The core reads only the environment keys spec §6
/// names as in-scope: `timezone`, `session_start`, `session_end`, and
/// `min_context`. Everything else (broker credentials, store connection
/// strings, alert sinks) belongs to out-of-scope collaborators.
#[derive(Debug, Clone)]
pub struct Config {
    pub timezone: Tz,
    pub session_start: NaiveTime,
    pub session_end: NaiveTime,
    pub min_context: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let timezone = env::var("TIMEZONE")
            .unwrap_or_else(|_| "Asia/Kolkata".to_string())
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid TIMEZONE: {e}"))?;

        let session_start = parse_time_env("SESSION_START", "09:15:00")?;
        let session_end = parse_time_env("SESSION_END", "15:30:00")?;

        let min_context = env::var("MIN_CONTEXT")
            .unwrap_or_else(|_| "150".to_string())
            .parse::<usize>()
            .context("invalid MIN_CONTEXT")?;

        let config = Self {
            timezone,
            session_start,
            session_end,
            min_context,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.min_context == 0 {
            anyhow::bail!("MIN_CONTEXT must be > 0");
        }
        Ok(())
    }
}

fn parse_time_env(key: &str, default: &str) -> Result<NaiveTime> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    NaiveTime::parse_from_str(&raw, "%H:%M:%S")
        .with_context(|| format!("invalid {key}: {raw}"))
}

/// Runtime-mutable BBW monitor configuration (C6), per spec §4.6 and the
/// `ConfigureMonitor` contract of §6. Published behind `arc_swap::ArcSwap`
/// (see `monitor.rs`) so updates are atomic and wait-free for readers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    pub alert_threshold_pct: f64,
    pub contracting_lookback: usize,
    pub squeeze_ratio: f64,
    pub cooldown: Duration,
    pub enable_alerts: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            alert_threshold_pct: 0.1,
            contracting_lookback: 5,
            squeeze_ratio: 1.05,
            cooldown: Duration::from_secs(180),
            enable_alerts: true,
        }
    }
}

impl MonitorConfig {
    /// Validates and applies a `ConfigureMonitor` update field by field.
    /// Invalid values return `ConfigError::Validation` and leave the
    /// receiver untouched — the caller should not publish a partially
    /// applied config.
    pub fn with_update(&self, update: MonitorConfigUpdate) -> Result<Self, ConfigError> {
        let mut next = self.clone();

        if let Some(v) = update.alert_threshold_pct {
            if !(0.0..=10.0).contains(&v) || v <= 0.0 {
                return Err(ConfigError::Validation {
                    field: "alert_threshold_pct",
                    reason: "must be in (0, 10]".to_string(),
                });
            }
            next.alert_threshold_pct = v;
        }

        if let Some(v) = update.contracting_lookback {
            if !(3..=50).contains(&v) {
                return Err(ConfigError::Validation {
                    field: "contracting_lookback",
                    reason: "must be in [3, 50]".to_string(),
                });
            }
            next.contracting_lookback = v;
        }

        if let Some(v) = update.squeeze_ratio {
            if !(v > 1.0 && v <= 2.0) {
                return Err(ConfigError::Validation {
                    field: "squeeze_ratio",
                    reason: "must be in (1.0, 2.0]".to_string(),
                });
            }
            next.squeeze_ratio = v;
        }

        if let Some(v) = update.cooldown {
            if v > Duration::from_secs(3600) {
                return Err(ConfigError::Validation {
                    field: "cooldown",
                    reason: "must be in [0, 1 hour]".to_string(),
                });
            }
            next.cooldown = v;
        }

        if let Some(v) = update.enable_alerts {
            next.enable_alerts = v;
        }

        Ok(next)
    }
}

/// A partial `ConfigureMonitor` request: only the fields present are
/// updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfigUpdate {
    pub alert_threshold_pct: Option<f64>,
    pub contracting_lookback: Option<usize>,
    pub squeeze_ratio: Option<f64>,
    pub cooldown: Option<Duration>,
    pub enable_alerts: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.contracting_lookback, 5);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let cfg = MonitorConfig::default();
        let update = MonitorConfigUpdate {
            alert_threshold_pct: Some(20.0),
            ..Default::default()
        };
        assert!(cfg.with_update(update).is_err());
    }

    #[test]
    fn rejects_out_of_range_lookback() {
        let cfg = MonitorConfig::default();
        let update = MonitorConfigUpdate {
            contracting_lookback: Some(1),
            ..Default::default()
        };
        assert!(cfg.with_update(update).is_err());
    }

    #[test]
    fn applies_valid_partial_update() {
        let cfg = MonitorConfig::default();
        let update = MonitorConfigUpdate {
            squeeze_ratio: Some(1.2),
            ..Default::default()
        };
        let next = cfg.with_update(update).unwrap();
        assert_eq!(next.squeeze_ratio, 1.2);
        assert_eq!(next.contracting_lookback, cfg.contracting_lookback);
    }
}
