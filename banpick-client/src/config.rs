// Configuration loading and parsing (config/client.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::champions;
use crate::draft::resolver::ParticipationMode;
use crate::protocol::RoomSettings;
use crate::realtime;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// client.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionSettings,
    pub profile: ProfileConfig,
    pub room: RoomDefaults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// REST base URL, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Realtime base URL, e.g. `ws://localhost:8000`.
    pub ws_base_url: String,
}

/// Reconnection tuning. Defaults match the realtime client's policy
/// constants; the section may be omitted entirely.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub reconnect_base_delay_ms: u64,
    pub max_reconnect_attempts: u32,
    pub connect_timeout_secs: u64,
    pub watchdog_interval_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            reconnect_base_delay_ms: realtime::DEFAULT_RECONNECT_BASE_DELAY.as_millis() as u64,
            max_reconnect_attempts: realtime::DEFAULT_MAX_RECONNECT_ATTEMPTS,
            connect_timeout_secs: realtime::DEFAULT_CONNECT_TIMEOUT.as_secs(),
            watchdog_interval_ms: realtime::DEFAULT_WATCHDOG_INTERVAL.as_millis() as u64,
        }
    }
}

impl SessionSettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    pub fn retry_policy(&self) -> realtime::RetryPolicy {
        realtime::RetryPolicy {
            base_delay: self.base_delay(),
            max_attempts: self.max_reconnect_attempts,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileConfig {
    pub nickname: String,
    /// Champion-metadata language; must be one of the supported codes.
    pub language: String,
}

/// Default settings used when this client creates a room.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomDefaults {
    pub version: String,
    pub draft_mode: String,
    pub match_format: String,
    pub player_count: String,
    pub time_limit: String,
}

impl RoomDefaults {
    pub fn to_settings(&self) -> RoomSettings {
        RoomSettings {
            version: self.version.clone(),
            draft_mode: self.draft_mode.clone(),
            match_format: self.match_format.clone(),
            player_count: self.player_count.clone(),
            time_limit: self.time_limit.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/client.toml` relative to
/// `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization
/// automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("client.toml");
    let text = read_file(&path)?;
    let config = parse_config(&text, &path)?;
    validate(&config)?;
    Ok(config)
}

/// Parse a config document; the path is only used for error reporting.
pub(crate) fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Ensure `config/client.toml` exists by copying it from `defaults/` on
/// first run. Never overwrites an existing file.
pub fn ensure_config_files(base_dir: &Path) -> Result<(), ConfigError> {
    let source = base_dir.join("defaults").join("client.toml");
    let config_dir = base_dir.join("config");
    let target = config_dir.join("client.toml");

    if target.exists() {
        return Ok(());
    }
    if !source.exists() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither {} nor {} found; run from the project root or create the config",
                target.display(),
                source.display()
            ),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;
    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {}: {e}", source.display()),
    })?;
    Ok(())
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying the default config file first if needed.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.base_url.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "server.base_url".into(),
            message: "must not be empty".into(),
        });
    }
    if config.server.ws_base_url.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "server.ws_base_url".into(),
            message: "must not be empty".into(),
        });
    }

    if config.session.max_reconnect_attempts == 0 {
        return Err(ConfigError::ValidationError {
            field: "session.max_reconnect_attempts".into(),
            message: "must be at least 1".into(),
        });
    }
    if config.session.reconnect_base_delay_ms == 0 {
        return Err(ConfigError::ValidationError {
            field: "session.reconnect_base_delay_ms".into(),
            message: "must be greater than 0".into(),
        });
    }
    if config.session.connect_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "session.connect_timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }
    if config.session.watchdog_interval_ms == 0 {
        return Err(ConfigError::ValidationError {
            field: "session.watchdog_interval_ms".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.profile.nickname.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "profile.nickname".into(),
            message: "must not be empty".into(),
        });
    }
    if !champions::LANGUAGES.contains(&config.profile.language.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "profile.language".into(),
            message: format!(
                "unsupported language `{}`; expected one of {:?}",
                config.profile.language,
                champions::LANGUAGES
            ),
        });
    }

    if ParticipationMode::from_code(&config.room.player_count).is_none() {
        return Err(ConfigError::ValidationError {
            field: "room.player_count".into(),
            message: format!(
                "unknown participation mode `{}`; expected solo, representative, or team",
                config.room.player_count
            ),
        });
    }

    Ok(())
}
