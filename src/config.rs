use crate::error::{AppError, Result};

pub const SETTINGS_PATH: &str = "lottery_settings.json";
pub const RUN_PATH: &str = "lottery.json";

/// Channel capacity for controller control messages.
pub const CHANNEL_CAPACITY: usize = 256;

/// Ephemeral replies to the participate button and /startlottery are removed after this long.
pub const REPLY_TTL_SECS: u64 = 5;

/// Custom id of the button attached to the giveaway announcement.
pub const PARTICIPATE_BUTTON_ID: &str = "participate";

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    /// Channel that receives announcements (CHANNEL_ID)
    pub channel_id: u64,
    /// Application id handed to the gateway client (APPLICATION_ID)
    pub application_id: Option<u64>,
    /// Guild to register slash commands on; global registration when unset (GUILD_ID)
    pub guild_id: Option<u64>,
    pub settings_path: String,
    pub run_path: String,
    pub log_level: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            discord_token: std::env::var("DISCORD_TOKEN")
                .map_err(|_| AppError::Config("DISCORD_TOKEN must be set".to_string()))?,
            channel_id: std::env::var("CHANNEL_ID")
                .map_err(|_| AppError::Config("CHANNEL_ID must be set".to_string()))?
                .parse::<u64>()
                .map_err(|_| AppError::Config("CHANNEL_ID must be a numeric id".to_string()))?,
            application_id: optional_id("APPLICATION_ID")?,
            guild_id: optional_id("GUILD_ID")?,
            settings_path: std::env::var("SETTINGS_PATH")
                .unwrap_or_else(|_| SETTINGS_PATH.to_string()),
            run_path: std::env::var("RUN_PATH").unwrap_or_else(|_| RUN_PATH.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
        })
    }
}

fn optional_id(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{key} must be a numeric id"))),
        _ => Ok(None),
    }
}
