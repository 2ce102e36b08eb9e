//! Parrot configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ParrotError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParrotConfig {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
}

impl ParrotConfig {
    /// Load config from the default path (~/.parrot/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ParrotError::Config(format!("Failed to read config: {e}")))?;
        Self::parse(&content)
    }

    /// Parse config from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ParrotError::Config(format!("Failed to parse config: {e}")))
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Parrot home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".parrot")
    }
}

/// Identity and global behaviour of the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_nick")]
    pub nick: String,
    #[serde(default)]
    pub admins: Vec<String>,
    /// Start muted (`.ded`) until an admin says `.active`.
    #[serde(default)]
    pub start_dead: bool,
    #[serde(default)]
    pub shitposting: bool,
    /// Only logged-in users may use the expensive commands.
    #[serde(default)]
    pub greens_only: bool,
}

fn default_nick() -> String { "parrot".into() }

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            nick: default_nick(),
            admins: Vec::new(),
            start_dead: false,
            shitposting: false,
            greens_only: false,
        }
    }
}

/// Command categories that can be switched off before instantiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    #[serde(default = "bool_true")]
    pub phrases: bool,
    #[serde(default)]
    pub uploads: bool,
}

fn bool_true() -> bool { true }

impl Default for FeatureConfig {
    fn default() -> Self {
        Self { phrases: true, uploads: false }
    }
}

/// Nick-based ignore and suppression lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Nick substrings that never reach a handler.
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Nick substrings limited to one claimed command per cooldown window.
    #[serde(default)]
    pub watchlist: Vec<String>,
}

/// Room directory and crawler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Program (plus leading args) invoked as `<cmd...> <room>`.
    #[serde(default = "default_probe_command")]
    pub probe_command: Vec<String>,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_pulse_interval")]
    pub pulse_interval_secs: u64,
    #[serde(default = "default_refresh_throttle")]
    pub refresh_throttle_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Probe processes allowed to run at the same time.
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,
    /// Delete rooms classified dead instead of keeping them flagged.
    #[serde(default = "bool_true")]
    pub purge_dead: bool,
    #[serde(default = "default_listing_budget")]
    pub listing_budget: usize,
    #[serde(default)]
    pub ignore_rooms: Vec<String>,
    #[serde(default)]
    pub ignore_nicks: Vec<String>,
    #[serde(default)]
    pub pinned_first: Vec<String>,
    #[serde(default)]
    pub pinned_last: Vec<String>,
}

fn default_db_path() -> String { "~/.parrot/rooms.db".into() }
fn default_probe_command() -> Vec<String> { vec!["parrot-roomstat".into()] }
fn default_probe_timeout() -> u64 { 3 }
fn default_pulse_interval() -> u64 { 180 }
fn default_refresh_throttle() -> u64 { 120 }
fn default_batch_size() -> usize { 5 }
fn default_max_concurrent_probes() -> usize { 5 }
fn default_listing_budget() -> usize { 295 }

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            probe_command: default_probe_command(),
            probe_timeout_secs: default_probe_timeout(),
            pulse_interval_secs: default_pulse_interval(),
            refresh_throttle_secs: default_refresh_throttle(),
            batch_size: default_batch_size(),
            max_concurrent_probes: default_max_concurrent_probes(),
            purge_dead: true,
            listing_budget: default_listing_budget(),
            ignore_rooms: Vec::new(),
            ignore_nicks: Vec::new(),
            pinned_first: Vec::new(),
            pinned_last: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    /// Database path with `~` expanded.
    pub fn resolved_db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).to_string())
    }
}

/// Per-command knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_request_cooldown")]
    pub request_cooldown_secs: u64,
    #[serde(default = "default_request_capacity")]
    pub request_cache_size: usize,
    /// File with one quote per line for `!quote`.
    #[serde(default)]
    pub quotes_path: Option<String>,
}

fn default_request_cooldown() -> u64 { 60 * 60 }
fn default_request_capacity() -> usize { 20 }

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            request_cooldown_secs: default_request_cooldown(),
            request_cache_size: default_request_capacity(),
            quotes_path: None,
        }
    }
}
