use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from monitor.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    pub fuzzer: FuzzerConfig,
    pub watchdog: WatchdogConfig,
}

/// Where the fuzzer writes its output and how to find its processes.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FuzzerConfig {
    pub output_dir: PathBuf,
    pub stats_file: String,
    pub process_pattern: String,
}

/// Stagnation thresholds and polling cadence.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub max_time_without_finds_secs: u64,
    pub check_interval_secs: u64,
}

/// Telegram credentials, read once from the environment at startup and
/// passed by reference from there on. Never read inside the core loop.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

// --- Default implementations ---

impl Default for FuzzerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            stats_file: "fuzzer_stats".to_string(),
            process_pattern: "afl-fuzz".to_string(),
        }
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            max_time_without_finds_secs: 3600,
            check_interval_secs: 60,
        }
    }
}

/// Errors loading the config file.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl MonitorConfig {
    /// Load from a TOML file. A missing file yields all defaults;
    /// CLI flags override on top of whatever was loaded.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Full path to the stats file the monitor polls.
    pub fn stats_path(&self) -> PathBuf {
        self.fuzzer.output_dir.join(&self.fuzzer.stats_file)
    }
}

/// Read Telegram credentials from the environment. Both variables must
/// be present and non-empty; otherwise notifications are disabled.
pub fn telegram_from_env() -> Option<TelegramConfig> {
    let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
    let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
    if bot_token.is_empty() || chat_id.is_empty() {
        return None;
    }
    Some(TelegramConfig { bot_token, chat_id })
}
