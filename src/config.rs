//! Application-level configuration loading: default room settings, room
//! time-to-live, presence retry budget, and the auto-skip grace window.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::room::{ControlMode, RoomSettings};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "POMOROOM_BACK_CONFIG_PATH";

const DEFAULT_FOCUS_SEC: u32 = 1500;
const DEFAULT_BREAK_SEC: u32 = 300;
const DEFAULT_LONG_BREAK_SEC: u32 = 900;
const DEFAULT_LONG_BREAK_EVERY: u32 = 4;
const DEFAULT_ROOM_TTL_SECS: u64 = 86_400;
const DEFAULT_REMOVE_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_REMOVE_RETRY_BASE_DELAY_MS: u64 = 50;
const DEFAULT_AUTO_SKIP_GRACE_MS: u64 = 2_000;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_settings: RoomSettings,
    room_ttl: Duration,
    remove_retry_attempts: u32,
    remove_retry_base_delay: Duration,
    auto_skip_grace_ms: u64,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to
    /// built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration from file");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Settings used for rooms created without an explicit override.
    pub fn default_settings(&self) -> &RoomSettings {
        &self.default_settings
    }

    /// Time-to-live re-armed on every room write.
    pub fn room_ttl(&self) -> Duration {
        self.room_ttl
    }

    /// Bounded retry budget for participant removal.
    pub fn remove_retry_attempts(&self) -> u32 {
        self.remove_retry_attempts
    }

    /// Base delay of the linear removal backoff.
    pub fn remove_retry_base_delay(&self) -> Duration {
        self.remove_retry_base_delay
    }

    /// Clock-skew grace window applied to automatic skips, in milliseconds.
    pub fn auto_skip_grace_ms(&self) -> u64 {
        self.auto_skip_grace_ms
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_settings: RoomSettings {
                focus_sec: DEFAULT_FOCUS_SEC,
                break_sec: DEFAULT_BREAK_SEC,
                long_break_sec: DEFAULT_LONG_BREAK_SEC,
                long_break_every: DEFAULT_LONG_BREAK_EVERY,
                mode: ControlMode::Collab,
            },
            room_ttl: Duration::from_secs(DEFAULT_ROOM_TTL_SECS),
            remove_retry_attempts: DEFAULT_REMOVE_RETRY_ATTEMPTS,
            remove_retry_base_delay: Duration::from_millis(DEFAULT_REMOVE_RETRY_BASE_DELAY_MS),
            auto_skip_grace_ms: DEFAULT_AUTO_SKIP_GRACE_MS,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file.
struct RawConfig {
    focus_sec: Option<u32>,
    break_sec: Option<u32>,
    long_break_sec: Option<u32>,
    long_break_every: Option<u32>,
    control_mode: Option<RawControlMode>,
    room_ttl_secs: Option<u64>,
    remove_retry_attempts: Option<u32>,
    auto_skip_grace_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawControlMode {
    Collab,
    Host,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            default_settings: RoomSettings {
                focus_sec: raw.focus_sec.unwrap_or(DEFAULT_FOCUS_SEC),
                break_sec: raw.break_sec.unwrap_or(DEFAULT_BREAK_SEC),
                long_break_sec: raw.long_break_sec.unwrap_or(DEFAULT_LONG_BREAK_SEC),
                long_break_every: raw.long_break_every.unwrap_or(DEFAULT_LONG_BREAK_EVERY),
                mode: match raw.control_mode {
                    Some(RawControlMode::Host) => ControlMode::Host,
                    Some(RawControlMode::Collab) | None => ControlMode::Collab,
                },
            },
            room_ttl: raw
                .room_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.room_ttl),
            remove_retry_attempts: raw
                .remove_retry_attempts
                .unwrap_or(DEFAULT_REMOVE_RETRY_ATTEMPTS),
            remove_retry_base_delay: defaults.remove_retry_base_delay,
            auto_skip_grace_ms: raw
                .auto_skip_grace_ms
                .unwrap_or(DEFAULT_AUTO_SKIP_GRACE_MS),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
