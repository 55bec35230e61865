use std::{env, str::FromStr, time::Duration};

use log::{info, warn};

use crate::error::ConfigError;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub generation_timeout: Duration,
    pub shuffle_options: bool,
    pub http_port: u16,
    pub dialogue_db: String,
    pub records_db: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR).filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            warn!("{API_KEY_VAR} is not set, generation requests will be refused");
        }

        Ok(Self {
            api_key,
            model: load(&lookup, "OPENAI_MODEL", "gpt-3.5-turbo")?,
            generation_timeout: Duration::from_secs(load(
                &lookup,
                "GENERATION_TIMEOUT_SECS",
                "30",
            )?),
            shuffle_options: load(&lookup, "SHUFFLE_OPTIONS", "true")?,
            http_port: load(&lookup, "HTTP_PORT", "8080")?,
            dialogue_db: load(&lookup, "DIALOGUE_DB", "db.sqlite")?,
            records_db: load(&lookup, "RECORDS_DB", "sqlite:records.sqlite")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            generation_timeout: Duration::from_secs(30),
            shuffle_options: true,
            http_port: 8080,
            dialogue_db: "db.sqlite".to_string(),
            records_db: "sqlite:records.sqlite".to_string(),
        }
    }
}

fn load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.generation_timeout, Duration::from_secs(30));
        assert!(config.shuffle_options);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.dialogue_db, "db.sqlite");
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = config_from(&[(API_KEY_VAR, "   ")]).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn overrides() {
        let config = config_from(&[
            (API_KEY_VAR, "sk-test"),
            ("OPENAI_MODEL", "gpt-4"),
            ("HTTP_PORT", "9000"),
            ("SHUFFLE_OPTIONS", "false"),
        ])
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.http_port, 9000);
        assert!(!config.shuffle_options);
    }

    #[test]
    fn invalid_number_is_reported() {
        let err = config_from(&[("HTTP_PORT", "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "HTTP_PORT".into(),
                value: "eighty".into()
            }
        );
    }
}
