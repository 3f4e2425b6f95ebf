//! Startup configuration, read once from the environment.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    str::FromStr,
};

use vision_relay_session::StoreLimits;
use vision_relay_upstream::UpstreamConfig;

const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";
const DEFAULT_MODEL: &str = "google/gemma-3-4b";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_STATIC_DIR: &str = "public";

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Relay server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `LM_BASE_URL`: OpenAI-compatible API root of the model server.
    pub base_url: String,
    /// `LM_MODEL`: model identifier.
    pub model: String,
    /// `RELAY_HOST`: listen address.
    pub host: IpAddr,
    /// `PORT`: listen port.
    pub port: u16,
    /// `RELAY_STATIC_DIR`: directory holding the browser client.
    pub static_dir: PathBuf,
    /// `RELAY_MAX_TURNS`: per-session turn cap, unbounded when unset.
    pub max_turns: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            max_turns: None,
        }
    }
}

impl Config {
    /// Read the configuration from process environment variables.
    ///
    /// # Errors
    /// Returns error if a numeric or address variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    /// Returns error if a numeric or address variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            base_url: get("LM_BASE_URL").map_or(defaults.base_url, |url| {
                url.trim().trim_end_matches('/').to_string()
            }),
            model: get("LM_MODEL").unwrap_or(defaults.model),
            host: parse_var("RELAY_HOST", get("RELAY_HOST"))?.unwrap_or(defaults.host),
            port: parse_var("PORT", get("PORT"))?.unwrap_or(defaults.port),
            static_dir: get("RELAY_STATIC_DIR").map_or(defaults.static_dir, PathBuf::from),
            max_turns: parse_var("RELAY_MAX_TURNS", get("RELAY_MAX_TURNS"))?,
        })
    }

    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub fn upstream(&self) -> UpstreamConfig {
        UpstreamConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            connect_timeout: None,
        }
    }

    #[must_use]
    pub const fn store_limits(&self) -> StoreLimits {
        StoreLimits {
            max_turns: self.max_turns,
        }
    }
}

fn parse_var<T>(var: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.base_url, "http://localhost:1234/v1");
        assert_eq!(config.model, "google/gemma-3-4b");
        assert_eq!(config.listen_addr().port(), 3000);
        assert_eq!(config.store_limits(), StoreLimits::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("LM_BASE_URL", "http://10.0.0.5:8080/v1/"),
            ("LM_MODEL", "qwen2-vl"),
            ("RELAY_HOST", "127.0.0.1"),
            ("PORT", "8081"),
            ("RELAY_STATIC_DIR", "/srv/client"),
            ("RELAY_MAX_TURNS", "40"),
        ])
        .unwrap();

        assert_eq!(config.base_url, "http://10.0.0.5:8080/v1");
        assert_eq!(config.upstream().model, "qwen2-vl");
        assert_eq!(config.listen_addr(), "127.0.0.1:8081".parse().unwrap());
        assert_eq!(config.static_dir, PathBuf::from("/srv/client"));
        assert_eq!(config.store_limits().max_turns, Some(40));
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let config = config_from(&[("PORT", ""), ("LM_MODEL", "  ")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.model, "google/gemma-3-4b");
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let err = config_from(&[("PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));
        assert!(err.to_string().contains("PORT"));
    }
}
