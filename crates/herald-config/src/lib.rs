use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod store;

pub use store::BroadcastStore;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("corrupt broadcast config at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid UTC offset {0:?} (expected \"+HH:MM\" or \"-HH:MM\")")]
    BadOffset(String),
    #[error("Config directory not found")]
    NoDirFound,
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Connection settings for the WhatsApp-web bridge daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Base URL of the bridge HTTP API.
    #[serde(default = "default_bridge_url")]
    pub base_url: String,
    /// Bearer token for the bridge (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:8450".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_url(),
            auth_token: None,
        }
    }
}

/// Fixed settings of the confirmation/broadcast flow. These are operator
/// settings, not the runtime-editable broadcast content (see
/// [`store::BroadcastStore`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastSettings {
    /// Destination that receives the confirmation prompt. The scheduler
    /// cannot request confirmation until this is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<String>,
    /// Reaction emoji that approves a pending broadcast.
    #[serde(default = "default_approve_emoji")]
    pub approve_emoji: String,
    /// Text of the confirmation prompt.
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// The distinguished status/story destination.
    #[serde(default = "default_status_destination")]
    pub status_destination: String,
    /// Background color for text-only status posts.
    #[serde(default = "default_status_background")]
    pub status_background: String,
    /// Delay between destination sends, in seconds.
    #[serde(default = "default_pacing_secs")]
    pub pacing_secs: u64,
    /// UTC offset the schedule is evaluated in (e.g. "+02:00").
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

fn default_approve_emoji() -> String {
    "\u{1F44D}".to_string()
}

fn default_prompt() -> String {
    "Should I run the automation? React with \u{1F44D} to confirm.".to_string()
}

fn default_status_destination() -> String {
    "status@broadcast".to_string()
}

fn default_status_background() -> String {
    "#FF0000".to_string()
}

fn default_pacing_secs() -> u64 {
    2
}

fn default_utc_offset() -> String {
    "+02:00".to_string()
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            approver: None,
            approve_emoji: default_approve_emoji(),
            prompt: default_prompt(),
            status_destination: default_status_destination(),
            status_background: default_status_background(),
            pacing_secs: default_pacing_secs(),
            utc_offset: default_utc_offset(),
        }
    }
}

impl BroadcastSettings {
    /// Pacing delay between destination sends.
    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }

    /// Parse the configured UTC offset.
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        parse_utc_offset(&self.utc_offset)
    }
}

/// Top-level herald configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeraldConfig {
    /// Gateway server config.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Bridge daemon connection.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Confirmation and fan-out settings.
    #[serde(default)]
    pub broadcast: BroadcastSettings,
    /// Directory holding the broadcast config and uploads. Defaults to
    /// `~/.herald/data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl HeraldConfig {
    /// Resolve the data directory, falling back to `~/.herald/data`.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(config_dir()?.join("data")),
        }
    }
}

/// Parse a `"+HH:MM"` / `"-HH:MM"` UTC offset string.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset, ConfigError> {
    let bad = || ConfigError::BadOffset(s.to_string());
    let bytes = s.as_bytes();
    let well_formed = bytes.len() == 6
        && (bytes[0] == b'+' || bytes[0] == b'-')
        && bytes[3] == b':'
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_digit()
        && bytes[4].is_ascii_digit()
        && bytes[5].is_ascii_digit();
    if !well_formed {
        return Err(bad());
    }
    let hours: i32 = s[1..3].parse().map_err(|_| bad())?;
    let minutes: i32 = s[4..6].parse().map_err(|_| bad())?;
    if hours > 14 || minutes > 59 {
        return Err(bad());
    }
    let seconds = hours * 3600 + minutes * 60;
    let offset = if bytes[0] == b'+' {
        FixedOffset::east_opt(seconds)
    } else {
        FixedOffset::west_opt(seconds)
    };
    offset.ok_or_else(bad)
}

/// Resolve the herald config directory (~/.herald/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".herald"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.herald/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, falling back to defaults if
/// the file is absent. A present-but-unparsable file is an error.
pub fn load_config() -> Result<HeraldConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    load_config_from(&path)
}

/// Load configuration from a specific path. Absence means defaults;
/// corruption is reported, never silently defaulted.
pub fn load_config_from(path: &Path) -> Result<HeraldConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(HeraldConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: HeraldConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Save configuration to the default path.
pub fn save_config(config: &HeraldConfig) -> Result<(), ConfigError> {
    let dir = ensure_config_dir()?;
    let path = dir.join("config.json5");
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::Io(std::io::Error::other(e)))?;
    std::fs::write(path, content)?;
    Ok(())
}
