//! Bot configuration.

use crate::error::ConfigError;
use crate::submit::RetryPolicy;
use crate::transport::TimeControl;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "LICHESS_API_TOKEN";

/// Configuration for a bot account.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct BotConfig {
    /// API root.
    #[serde(default = "default_api_url")]
    api_url: String,

    /// Path of the analysis endpoint used as move oracle.
    #[serde(default = "default_analysis_path")]
    analysis_path: String,

    /// Bot account id; fetched from the API when absent.
    #[serde(default)]
    bot_id: Option<String>,

    /// Ledger file.
    #[serde(default = "default_ledger_path")]
    ledger_path: PathBuf,

    /// Seconds between active-game polls.
    #[serde(default = "default_poll_interval_secs")]
    poll_interval_secs: u64,

    /// Seconds a game stream may stay silent before it is dropped.
    #[serde(default = "default_stream_idle_timeout_secs")]
    stream_idle_timeout_secs: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,

    /// Ranked variations requested from the oracle.
    #[serde(default = "default_oracle_variations")]
    oracle_variations: u8,

    /// Attempts per move submission.
    #[serde(default = "default_submit_attempts")]
    submit_attempts: u32,

    /// Milliseconds between submission attempts.
    #[serde(default = "default_submit_retry_delay_ms")]
    submit_retry_delay_ms: u64,

    /// Milliseconds before the bot decides again after a turn produced no move.
    #[serde(default = "default_decision_retry_ms")]
    decision_retry_ms: u64,

    /// Whether new games are picked up at startup.
    #[serde(default = "default_matchmaking")]
    matchmaking: bool,

    /// Whether incoming challenges are answered.
    #[serde(default = "default_accept_challenges")]
    accept_challenges: bool,

    /// Time control for challenges that do not name one.
    #[serde(default = "default_time_control")]
    default_time_control: String,
}

fn default_api_url() -> String {
    "https://lichess.org".to_string()
}

fn default_analysis_path() -> String {
    "/api/cloud-eval".to_string()
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("game_memory.json")
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_stream_idle_timeout_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_oracle_variations() -> u8 {
    1
}

fn default_submit_attempts() -> u32 {
    3
}

fn default_submit_retry_delay_ms() -> u64 {
    500
}

fn default_decision_retry_ms() -> u64 {
    2000
}

fn default_matchmaking() -> bool {
    true
}

fn default_accept_challenges() -> bool {
    true
}

fn default_time_control() -> String {
    "3+2".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            analysis_path: default_analysis_path(),
            bot_id: None,
            ledger_path: default_ledger_path(),
            poll_interval_secs: default_poll_interval_secs(),
            stream_idle_timeout_secs: default_stream_idle_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            oracle_variations: default_oracle_variations(),
            submit_attempts: default_submit_attempts(),
            submit_retry_delay_ms: default_submit_retry_delay_ms(),
            decision_retry_ms: default_decision_retry_ms(),
            matchmaking: default_matchmaking(),
            accept_challenges: default_accept_challenges(),
            default_time_control: default_time_control(),
        }
    }
}

impl BotConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        info!(api_url = %config.api_url, "Config loaded successfully");
        Ok(config)
    }

    /// Loads the file if it exists, defaults otherwise.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::new("poll_interval_secs must be positive"));
        }
        if self.stream_idle_timeout_secs == 0 {
            return Err(ConfigError::new("stream_idle_timeout_secs must be positive"));
        }
        if self.decision_retry_ms == 0 {
            return Err(ConfigError::new("decision_retry_ms must be positive"));
        }
        self.time_control()?;
        Ok(())
    }

    /// Reads the API token from the environment.
    #[instrument(skip(self))]
    pub fn api_token(&self) -> Result<String, ConfigError> {
        std::env::var(TOKEN_ENV)
            .map_err(|_| ConfigError::new(format!("{} environment variable not set", TOKEN_ENV)))
    }

    /// Overrides the ledger path.
    pub fn with_ledger_path(mut self, path: PathBuf) -> Self {
        self.ledger_path = path;
        self
    }

    /// Overrides the startup matchmaking state.
    pub fn with_matchmaking(mut self, enabled: bool) -> Self {
        self.matchmaking = enabled;
        self
    }

    /// Default time control, parsed.
    pub fn time_control(&self) -> Result<TimeControl, ConfigError> {
        self.default_time_control
            .parse()
            .map_err(|e: String| ConfigError::new(format!("Invalid default_time_control: {}", e)))
    }

    /// Poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Stream idle timeout.
    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }

    /// Pause before an undecided turn is tried again.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.decision_retry_ms)
    }

    /// Request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Submission retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.submit_attempts.max(1),
            delay: Duration::from_millis(self.submit_retry_delay_ms),
        }
    }
}
