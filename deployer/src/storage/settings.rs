//! Settings file management

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use tracing::debug;

use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::logs::LogLevel;
use crate::storage::layout::KeyStrategy;

/// Environment variable pointing at the settings file
pub const SETTINGS_ENV: &str = "SHIPYARD_SETTINGS";

/// Deployer settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Directory for the log file
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Configuration repository
    #[serde(default)]
    pub repository: RepositorySettings,

    /// Scheduler connection
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Rollout supervision timings
    #[serde(default)]
    pub supervision: SupervisionSettings,
}

fn default_log_dir() -> PathBuf {
    std::env::temp_dir().join("shipyard")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_dir: default_log_dir(),
            repository: RepositorySettings::default(),
            scheduler: SchedulerSettings::default(),
            supervision: SupervisionSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `file`, falling back to defaults when it is absent
    pub async fn load(file: &File) -> Result<Self, DeployError> {
        if !file.exists().await {
            debug!("No settings at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }
        file.read_json::<Settings>().await.map_err(|e| {
            DeployError::SettingsError(format!("{}: {}", file.path().display(), e))
        })
    }

    /// Settings file location: explicit path, `$SHIPYARD_SETTINGS`, then
    /// `$HOME/.config/shipyard/settings.json`
    pub fn locate(explicit: Option<PathBuf>) -> File {
        let path = explicit
            .or_else(|| std::env::var_os(SETTINGS_ENV).map(PathBuf::from))
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
                    .join("shipyard")
                    .join("settings.json")
            });
        File::new(path)
    }
}

/// Configuration repository settings
#[derive(Debug, Clone, Deserialize)]
pub struct RepositorySettings {
    /// Repository root
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Environment key resolution
    #[serde(default)]
    pub layout: KeyStrategy,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            root: default_root(),
            layout: KeyStrategy::default(),
        }
    }
}

/// Scheduler connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// Scheduler HTTP address
    #[serde(default = "default_address")]
    pub address: String,

    /// ACL token
    #[serde(default)]
    pub token: Option<SecretString>,

    /// Timeout of non-blocking requests in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_address() -> String {
    "http://127.0.0.1:4646".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            address: default_address(),
            token: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Rollout supervision timings
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisionSettings {
    /// Blocking query wait ceiling in seconds
    #[serde(default = "default_watch_wait")]
    pub watch_wait_secs: u64,

    /// Canary health check interval in seconds
    #[serde(default = "default_canary_interval")]
    pub canary_interval_secs: u64,

    /// Evaluation poll interval in seconds
    #[serde(default = "default_eval_poll")]
    pub eval_poll_secs: u64,

    /// Maximum wait for an evaluation to produce a deployment, in seconds
    #[serde(default = "default_eval_timeout")]
    pub eval_timeout_secs: u64,
}

fn default_watch_wait() -> u64 {
    5
}

fn default_canary_interval() -> u64 {
    5
}

fn default_eval_poll() -> u64 {
    1
}

fn default_eval_timeout() -> u64 {
    120
}

impl Default for SupervisionSettings {
    fn default() -> Self {
        Self {
            watch_wait_secs: default_watch_wait(),
            canary_interval_secs: default_canary_interval(),
            eval_poll_secs: default_eval_poll(),
            eval_timeout_secs: default_eval_timeout(),
        }
    }
}

impl SupervisionSettings {
    pub fn watch_wait(&self) -> Duration {
        Duration::from_secs(self.watch_wait_secs)
    }

    pub fn canary_interval(&self) -> Duration {
        Duration::from_secs(self.canary_interval_secs)
    }

    pub fn eval_poll(&self) -> Duration {
        Duration::from_secs(self.eval_poll_secs)
    }

    pub fn eval_timeout(&self) -> Duration {
        Duration::from_secs(self.eval_timeout_secs)
    }
}
