//! Server configuration from environment variables

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9100";
/// ~60Hz, standing in for the display refresh clock
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);
/// Minimum spacing between GPS reports
pub const MIN_REPORT_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_TRIP_DURATION: Duration = Duration::from_millis(120_000);
pub const DEFAULT_POSITION_LOG_CAPACITY: usize = 1000;
pub const DEFAULT_POSITION_LOG_VEHICLES: usize = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Timing knobs for the playback engine and its frame clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    pub frame_interval: Duration,
    pub report_interval: Duration,
    pub default_duration: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            report_interval: MIN_REPORT_INTERVAL,
            default_duration: DEFAULT_TRIP_DURATION,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub playback: PlaybackConfig,
    /// Reports kept per vehicle in the in-memory position log
    pub position_log_capacity: usize,
    /// Vehicles tracked by the position log before the stalest is evicted
    pub position_log_vehicles: usize,
    /// Selects the Mapbox provider when set, the demo provider otherwise
    pub mapbox_token: Option<String>,
    /// Registered as an HTTP sink at startup
    pub position_sink_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9100)),
            playback: PlaybackConfig::default(),
            position_log_capacity: DEFAULT_POSITION_LOG_CAPACITY,
            position_log_vehicles: DEFAULT_POSITION_LOG_VEHICLES,
            mapbox_token: None,
            position_sink_url: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, test map)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = PlaybackConfig::default();

        let bind_addr = parse_or(&lookup, "FP_BIND_ADDR", DEFAULT_BIND_ADDR.to_string())?;
        let frame_interval = millis_or(&lookup, "FP_FRAME_INTERVAL_MS", defaults.frame_interval)?;
        let report_interval =
            millis_or(&lookup, "FP_REPORT_INTERVAL_MS", defaults.report_interval)?;
        let default_duration =
            millis_or(&lookup, "FP_DEFAULT_DURATION_MS", defaults.default_duration)?;
        let position_log_capacity = parse_or(
            &lookup,
            "FP_POSITION_LOG_CAPACITY",
            DEFAULT_POSITION_LOG_CAPACITY.to_string(),
        )?;
        let position_log_vehicles = parse_or(
            &lookup,
            "FP_POSITION_LOG_VEHICLES",
            DEFAULT_POSITION_LOG_VEHICLES.to_string(),
        )?;

        if frame_interval.is_zero() {
            return Err(invalid("FP_FRAME_INTERVAL_MS", "0", "must be positive"));
        }
        if default_duration.is_zero() {
            return Err(invalid("FP_DEFAULT_DURATION_MS", "0", "must be positive"));
        }
        if position_log_capacity == 0 {
            return Err(invalid("FP_POSITION_LOG_CAPACITY", "0", "must be positive"));
        }
        if position_log_vehicles == 0 {
            return Err(invalid("FP_POSITION_LOG_VEHICLES", "0", "must be positive"));
        }

        Ok(Self {
            bind_addr,
            playback: PlaybackConfig {
                frame_interval,
                report_interval,
                default_duration,
            },
            position_log_capacity,
            position_log_vehicles,
            mapbox_token: non_empty(&lookup, "MAPBOX_ACCESS_TOKEN"),
            position_sink_url: non_empty(&lookup, "FP_POSITION_SINK_URL"),
        })
    }
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: String,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).unwrap_or(default);
    raw.trim().parse().map_err(|e| invalid(key, &raw, e))
}

fn millis_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let ms: u64 = parse_or(lookup, key, default.as_millis().to_string())?;
    Ok(Duration::from_millis(ms))
}
