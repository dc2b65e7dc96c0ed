//! Configuration for a bot instance.
//!
//! Loads from environment variables (with `.env` support) or is built
//! programmatically via [`Config::new`].

use serde::Deserialize;
use std::env;

use crate::api::DEFAULT_ENDPOINT;

/// Update acquisition mode. The two modes are mutually exclusive per bot
/// instance.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    Polling,
    Webhook,
}

impl Default for BotMode {
    fn default() -> Self {
        Self::Polling
    }
}

/// Bot instance configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub api_endpoint: String,

    // Webhook mode
    pub webhook_url: Option<String>,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,

    /// Bot username (without @) for `/cmd@botname` disambiguation.
    /// Optional - can be adopted via getMe at startup instead.
    pub bot_username: Option<String>,

    /// Server-side long-poll timeout in seconds.
    pub poll_timeout: u64,

    /// Capacity of the bounded update queue fed by the polling driver.
    pub queue_capacity: usize,
}

impl Config {
    /// Configuration with the given token and defaults for everything else.
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            bot_mode: BotMode::default(),
            api_endpoint: DEFAULT_ENDPOINT.to_string(),
            webhook_url: None,
            webhook_port: 8443,
            webhook_secret: None,
            bot_username: None,
            poll_timeout: 30,
            queue_capacity: 100,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if `BOT_TOKEN` is not set, or if `BOT_MODE` is `webhook`
    /// without a `WEBHOOK_URL`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let bot_mode = match env::var("BOT_MODE")
            .unwrap_or_else(|_| "polling".to_string())
            .to_lowercase()
            .as_str()
        {
            "webhook" => BotMode::Webhook,
            _ => BotMode::Polling,
        };

        let webhook_url = env::var("WEBHOOK_URL").ok();
        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            panic!("WEBHOOK_URL must be set when BOT_MODE is webhook");
        }

        // Strip @ if present.
        let bot_username = env::var("BOT_USERNAME")
            .ok()
            .map(|s| s.trim_start_matches('@').to_string())
            .filter(|s| !s.is_empty());

        Self {
            bot_token: env::var("BOT_TOKEN").expect("BOT_TOKEN must be set"),
            bot_mode,
            api_endpoint: env::var("API_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            webhook_url,
            webhook_port: parse_var("WEBHOOK_PORT", 8443),
            webhook_secret: env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            bot_username,
            poll_timeout: parse_var("POLL_TIMEOUT", 30),
            queue_capacity: parse_var("UPDATE_QUEUE_CAPACITY", 100),
        }
    }
}

/// Parse an env var, falling back to `default` when unset or malformed.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
