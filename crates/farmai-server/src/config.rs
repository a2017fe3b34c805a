//! Server configuration loaded from the environment.
//!
//! | Setting | Variable | Default |
//! |---------|----------|---------|
//! | Bind host | `HOST` | `0.0.0.0` |
//! | Bind port | `PORT` | `5000` |
//! | CORS origin | `FRONTEND_URL` | `http://localhost:3000` |
//! | OpenWeatherMap key | `OPENWEATHER_API_KEY` | unset |
//! | Weatherstack key | `WEATHERSTACK_API_KEY` | unset |
//! | Google AI key | `GOOGLE_AI_API_KEY` | unset |
//! | Sensoterra key | `SENSOTERRA_API_KEY` | unset |
//! | Requests per window | `RATE_LIMIT_MAX` | `100` |
//! | Rate limit window | `RATE_LIMIT_WINDOW_SECS` | `900` |
//! | Cache default TTL | `CACHE_DEFAULT_TTL_SECS` | `3600` |
//! | Cache sweep period | `CACHE_SWEEP_SECS` | `600` |
//!
//! Every variable may also be given with a `FARMAI_` prefix, which wins over
//! the bare name.

use std::time::Duration;

use thiserror::Error;

const ENV_PREFIX: &str = "FARMAI_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub openweather_api_key: Option<String>,
    pub weatherstack_api_key: Option<String>,
    pub google_ai_api_key: Option<String>,
    pub sensoterra_api_key: Option<String>,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub cache_default_ttl: Duration,
    pub cache_sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 5000,
            frontend_url: String::from("http://localhost:3000"),
            openweather_api_key: None,
            weatherstack_api_key: None,
            google_ai_api_key: None,
            sensoterra_api_key: None,
            rate_limit_max: 100,
            rate_limit_window: Duration::from_secs(900),
            cache_default_ttl: Duration::from_secs(3_600),
            cache_sweep_interval: Duration::from_secs(600),
        }
    }
}

impl ServerConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        let defaults = Self::default();

        Ok(Self {
            host: env.string("HOST").unwrap_or(defaults.host),
            port: env.parse("PORT", "a port number")?.unwrap_or(defaults.port),
            frontend_url: env.string("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            openweather_api_key: env.string("OPENWEATHER_API_KEY"),
            weatherstack_api_key: env.string("WEATHERSTACK_API_KEY"),
            google_ai_api_key: env.string("GOOGLE_AI_API_KEY"),
            sensoterra_api_key: env.string("SENSOTERRA_API_KEY"),
            rate_limit_max: env
                .parse_positive::<u32>("RATE_LIMIT_MAX")?
                .unwrap_or(defaults.rate_limit_max),
            rate_limit_window: env
                .parse_positive::<u64>("RATE_LIMIT_WINDOW_SECS")?
                .map_or(defaults.rate_limit_window, Duration::from_secs),
            cache_default_ttl: env
                .parse_positive::<u64>("CACHE_DEFAULT_TTL_SECS")?
                .map_or(defaults.cache_default_ttl, Duration::from_secs),
            cache_sweep_interval: env
                .parse_positive::<u64>("CACHE_SWEEP_SECS")?
                .map_or(defaults.cache_sweep_interval, Duration::from_secs),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Prefixed name first, then the bare name. Blank values count as unset.
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{key}"))
            .or_else(|| (self.lookup)(key))
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn parse<T: std::str::FromStr>(
        &self,
        key: &'static str,
        expected: &'static str,
    ) -> Result<Option<T>, ConfigError> {
        self.string(key)
            .map(|value| {
                value.parse().map_err(|_| ConfigError::InvalidValue {
                    key,
                    value: value.clone(),
                    expected,
                })
            })
            .transpose()
    }

    fn parse_positive<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr + Into<u64> + Copy,
    {
        const EXPECTED: &str = "a positive integer";
        match self.parse::<T>(key, EXPECTED)? {
            Some(value) if value.into() == 0 => Err(ConfigError::InvalidValue {
                key,
                value: String::from("0"),
                expected: EXPECTED,
            }),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).expect("defaults");
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
    }

    #[test]
    fn prefixed_variable_wins_over_bare_name() {
        let config = config_from(&[("PORT", "8080"), ("FARMAI_PORT", "9090")]).expect("valid");
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn blank_api_key_is_treated_as_unset() {
        let config = config_from(&[("OPENWEATHER_API_KEY", "  "), ("GOOGLE_AI_API_KEY", "g")])
            .expect("valid");
        assert_eq!(config.openweather_api_key, None);
        assert_eq!(config.google_ai_api_key.as_deref(), Some("g"));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = config_from(&[("PORT", "eighty")]).expect_err("must fail");
        assert!(matches!(err, ConfigError::InvalidValue { key: "PORT", .. }));

        let err = config_from(&[("RATE_LIMIT_WINDOW_SECS", "0")]).expect_err("must fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "RATE_LIMIT_WINDOW_SECS",
                ..
            }
        ));
    }
}
