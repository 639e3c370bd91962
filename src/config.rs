// src/config.rs
use std::{fmt, str::FromStr, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_AFFILIATE_ID: &str = "1844104";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotMode {
    /// Telegram pushes updates to `POST /webhook`.
    Webhook,
    /// The bot pulls updates with `getUpdates`.
    Polling,
}

impl FromStr for BotMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webhook" => Ok(Self::Webhook),
            "polling" => Ok(Self::Polling),
            _ => Err(()),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub telegram_token: String,
    pub telegram_api_base: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_temperature: f32,
    pub bind_addr: String,
    pub mode: BotMode,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub admin_key: Option<String>,
    pub session_ttl: Duration,
    pub generation_timeout: Duration,
    pub affiliate_id: String,
}

// Credentials stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_api_base", &self.telegram_api_base)
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("openai_temperature", &self.openai_temperature)
            .field("bind_addr", &self.bind_addr)
            .field("mode", &self.mode)
            .field("webhook_url", &self.webhook_url)
            .field("session_ttl", &self.session_ttl)
            .field("generation_timeout", &self.generation_timeout)
            .field("affiliate_id", &self.affiliate_id)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Blank values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let telegram_token = required("TELEGRAM_BOT_TOKEN")?;
        let openai_api_key = required("OPENAI_API_KEY")?;

        let mode = match get("BOT_MODE") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "BOT_MODE",
                value: raw,
            })?,
            None => BotMode::Webhook,
        };

        Ok(Self {
            telegram_token,
            telegram_api_base: get("TELEGRAM_API_BASE")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),
            openai_api_key,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_temperature: parse_or("OPENAI_TEMPERATURE", get("OPENAI_TEMPERATURE"), 0.7)?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            mode,
            webhook_url: get("WEBHOOK_URL"),
            webhook_secret: get("WEBHOOK_SECRET"),
            admin_key: get("ADMIN_KEY"),
            session_ttl: Duration::from_secs(
                60 * parse_or("SESSION_TTL_MINUTES", get("SESSION_TTL_MINUTES"), 30u64)?,
            ),
            generation_timeout: Duration::from_secs(parse_or(
                "GENERATION_TIMEOUT_SECS",
                get("GENERATION_TIMEOUT_SECS"),
                90u64,
            )?),
            affiliate_id: get("AFFILIATE_ID").unwrap_or_else(|| DEFAULT_AFFILIATE_ID.to_string()),
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let config = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();

        assert_eq!(config.mode, BotMode::Webhook);
        assert_eq!(config.openai_model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.session_ttl, Duration::from_secs(30 * 60));
        assert_eq!(config.generation_timeout, Duration::from_secs(90));
        assert_eq!(config.affiliate_id, DEFAULT_AFFILIATE_ID);
        assert!(config.admin_key.is_none());
    }

    #[test]
    fn missing_credentials_are_fatal() {
        let err = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TELEGRAM_BOT_TOKEN")));

        let err = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("OPENAI_API_KEY", "  "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("OPENAI_API_KEY")));
    }

    #[test]
    fn rejects_unparsable_settings() {
        let err = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("OPENAI_API_KEY", "sk-test"),
            ("GENERATION_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "GENERATION_TIMEOUT_SECS",
                ..
            }
        ));

        let err = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("OPENAI_API_KEY", "sk-test"),
            ("BOT_MODE", "carrier-pigeon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BOT_MODE", .. }));
    }

    #[test]
    fn debug_output_hides_credentials() {
        let config = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:secret-token"),
            ("OPENAI_API_KEY", "sk-very-secret"),
            ("BOT_MODE", "Polling"),
        ]))
        .unwrap();
        let rendered = format!("{config:?}");
        assert_eq!(config.mode, BotMode::Polling);
        assert!(!rendered.contains("secret-token"));
        assert!(!rendered.contains("sk-very-secret"));
    }
}
