//! Runtime configuration read from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BOT_NAME: &str = "barkeep";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_COCKTAILDB_BASE_URL: &str = "https://www.thecocktaildb.com/api/json/v1/1/";
pub const DEFAULT_LIBRETRANSLATE_URL: &str = "http://localhost:5000/translate";
pub const DEFAULT_TARGET_LANG: &str = "ru";
pub const DEFAULT_CACHE_DB_PATH: &str = "barkeep-cache.db";
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub bot_name: String,
    pub telegram_api_url: String,
    pub cocktaildb_base_url: String,
    pub translation: TranslationConfig,
    /// `None` keeps the cache in memory only.
    pub cache_db_path: Option<PathBuf>,
    pub poll_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub enabled: bool,
    pub target_lang: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "required variable {key} is not set"),
            ConfigError::Invalid { key, value } => {
                write!(f, "invalid value for {key}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl BotConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());
        let get_or = |key: &str, default: &str| {
            get(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let bot_token = get("TELEGRAM_BOT_TOKEN")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let enabled = match get("TRANSLATION_ENABLED") {
            Some(v) if !v.is_empty() => parse_bool("TRANSLATION_ENABLED", &v)?,
            _ => true,
        };

        let poll_timeout_secs = match get("POLL_TIMEOUT_SECS") {
            Some(v) if !v.is_empty() => v.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "POLL_TIMEOUT_SECS",
                value: v.clone(),
            })?,
            _ => DEFAULT_POLL_TIMEOUT_SECS,
        };

        // An explicitly empty path selects the in-memory store.
        let cache_db_path = match get("CACHE_DB_PATH") {
            Some(v) if v.is_empty() => None,
            Some(v) => Some(PathBuf::from(v)),
            None => Some(PathBuf::from(DEFAULT_CACHE_DB_PATH)),
        };

        Ok(Self {
            bot_token,
            bot_name: get_or("BOT_NAME", DEFAULT_BOT_NAME),
            telegram_api_url: get_or("TELEGRAM_API_URL", DEFAULT_TELEGRAM_API_URL),
            cocktaildb_base_url: get_or("COCKTAILDB_BASE_URL", DEFAULT_COCKTAILDB_BASE_URL),
            translation: TranslationConfig {
                url: get_or("LIBRETRANSLATE_URL", DEFAULT_LIBRETRANSLATE_URL),
                api_key: get("LIBRETRANSLATE_API_KEY").filter(|v| !v.is_empty()),
                enabled,
                target_lang: get_or("TRANSLATION_TARGET_LANG", DEFAULT_TARGET_LANG)
                    .to_lowercase(),
            },
            cache_db_path,
            poll_timeout: Duration::from_secs(poll_timeout_secs),
        })
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let config = config_from(&[("TELEGRAM_BOT_TOKEN", "123:abc")]).unwrap();
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.bot_name, DEFAULT_BOT_NAME);
        assert_eq!(config.cocktaildb_base_url, DEFAULT_COCKTAILDB_BASE_URL);
        assert_eq!(config.translation.url, DEFAULT_LIBRETRANSLATE_URL);
        assert!(config.translation.enabled);
        assert_eq!(config.translation.target_lang, "ru");
        assert_eq!(
            config.cache_db_path,
            Some(PathBuf::from(DEFAULT_CACHE_DB_PATH))
        );
        assert_eq!(config.poll_timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_token_is_reported() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TELEGRAM_BOT_TOKEN")));
    }

    #[test]
    fn translation_switch_and_empty_cache_path() {
        let config = config_from(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("TRANSLATION_ENABLED", "off"),
            ("TRANSLATION_TARGET_LANG", "UK"),
            ("CACHE_DB_PATH", ""),
        ])
        .unwrap();
        assert!(!config.translation.enabled);
        assert_eq!(config.translation.target_lang, "uk");
        assert_eq!(config.cache_db_path, None);
    }

    #[test]
    fn garbage_values_are_rejected() {
        let err = config_from(&[("TELEGRAM_BOT_TOKEN", "t"), ("TRANSLATION_ENABLED", "maybe")])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "TRANSLATION_ENABLED",
                ..
            }
        ));

        let err = config_from(&[("TELEGRAM_BOT_TOKEN", "t"), ("POLL_TIMEOUT_SECS", "-1")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "POLL_TIMEOUT_SECS", .. }));
    }
}
