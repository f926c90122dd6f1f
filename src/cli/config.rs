//! Mod Warden configuration file handling
//!
//! Provides default configuration generation and loading for the bot.
//! Configuration files are TOML and live at
//! `<data_dir>/modwarden/config.toml` unless `--config` says otherwise.
//!
//! Durations are written the way people say them ("1h", "30m", "5s") and
//! parsed with humantime.

use modwarden::voting::VotingPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

const DEFAULT_ITEM_URL_PREFIX: &str = "https://steamcommunity.com/sharedfiles/filedetails/?id=";

/// Mod Warden operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Game server whose mods are managed
    pub server: ServerConfig,

    #[serde(default)]
    pub voting: VotingConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server settings location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directory holding `<name>.ini` and the graph artifacts
    pub config_dir: PathBuf,

    /// Server name (file stem of its settings file)
    #[serde(default = "default_server_name")]
    pub name: String,
}

/// Voting thresholds and windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingConfig {
    #[serde(default = "default_quorum")]
    pub quorum: u32,

    #[serde(default = "default_hard_cap")]
    pub hard_cap: u32,

    #[serde(default = "default_voting_window")]
    pub voting_window: String,

    #[serde(default = "default_extended_window")]
    pub extended_window: String,
}

/// Catalog access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_item_url_prefix")]
    pub item_url_prefix: String,

    /// Per-request timeout
    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Retry rounds for timed-out requests
    #[serde(default = "default_retry_rounds")]
    pub retry_rounds: u32,
}

/// Chat transport selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_transport")]
    pub transport: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_server_name() -> String {
    "servertest".to_string()
}

fn default_quorum() -> u32 {
    3
}

fn default_hard_cap() -> u32 {
    5
}

fn default_voting_window() -> String {
    "1h".to_string()
}

fn default_extended_window() -> String {
    "30m".to_string()
}

fn default_item_url_prefix() -> String {
    DEFAULT_ITEM_URL_PREFIX.to_string()
}

fn default_timeout() -> String {
    "5s".to_string()
}

fn default_retry_rounds() -> u32 {
    2
}

fn default_transport() -> String {
    "console".to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            quorum: default_quorum(),
            hard_cap: default_hard_cap(),
            voting_window: default_voting_window(),
            extended_window: default_extended_window(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            item_url_prefix: default_item_url_prefix(),
            timeout: default_timeout(),
            retry_rounds: default_retry_rounds(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

fn parse_window(field: &str, input: &str) -> Result<Duration, String> {
    humantime::parse_duration(input)
        .map_err(|e| format!("Invalid duration for {} '{}': {}", field, input, e))
}

impl WardenConfig {
    /// Create a configuration for the given server directory
    #[cfg(test)]
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            server: ServerConfig {
                config_dir,
                name: default_server_name(),
            },
            voting: VotingConfig::default(),
            catalog: CatalogConfig::default(),
            chat: ChatConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: WardenConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        config
            .voting_policy()
            .map_err(|e| format!("Invalid config file '{}': {}", path.display(), e))?;
        config.catalog_timeout()?;

        Ok(config)
    }

    /// Load, generating a default file first if none exists
    pub fn load_or_create(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            println!("No config file found. Creating default configuration...");
            Self::create_default(path, &default_server_dir())?;
            println!("   Created: {}", path.display());
        }
        Self::load(path)
    }

    /// Save configuration to a TOML file
    #[cfg(test)]
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Voting policy with parsed and validated windows
    pub fn voting_policy(&self) -> Result<VotingPolicy, String> {
        let policy = VotingPolicy {
            quorum: self.voting.quorum,
            hard_cap: self.voting.hard_cap,
            voting_window: parse_window("voting_window", &self.voting.voting_window)?,
            extended_window: parse_window("extended_window", &self.voting.extended_window)?,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn catalog_timeout(&self) -> Result<Duration, String> {
        parse_window("timeout", &self.catalog.timeout)
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(config_dir: &Path) -> String {
        format!(
            r#"# Mod Warden Configuration
#
# Members propose mods with /add_mod <catalog id>; the group votes and
# approved mods are installed together with everything they require.

[server]
# Directory holding the server settings file (<name>.ini). The dependency
# graph is stored next to it as <name>.json and <name>.graph.json.
config_dir = "{config_dir}"
name = "servertest"

[voting]
# Distinct voters that shorten the vote to extended_window
quorum = 3
# Distinct voters that close the vote immediately
hard_cap = 5
voting_window = "1h"
extended_window = "30m"

[catalog]
item_url_prefix = "{prefix}"
# Per-request timeout and retry rounds for timed-out requests
timeout = "5s"
retry_rounds = 2

[chat]
# Only "console" is available
transport = "console"

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG takes precedence)
level = "info"
"#,
            config_dir = config_dir.display(),
            prefix = DEFAULT_ITEM_URL_PREFIX,
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        config_dir: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(config_dir);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Default config file path: `<data_dir>/modwarden/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("modwarden")
        .join("config.toml")
}

/// Default server directory: `~/Zomboid/Server`
pub fn default_server_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Zomboid")
        .join("Server")
}

/// Write a default config file (`init-config`)
pub fn execute_init(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }
    WardenConfig::create_default(config_path, &default_server_dir())?;
    println!("Created: {}", config_path.display());
    Ok(())
}
