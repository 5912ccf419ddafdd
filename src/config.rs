use std::env;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_PATH: &str = "data.sqlite";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PORT must be a number, got {0:?}")]
    InvalidPort(String),
}

/// Process configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Public origin used for every `self` and `next` link
    pub api_base_url: String,
    pub debug_routes: bool,
}

impl Config {
    /// Load from the environment, after applying any `.env` file
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let database_path =
            lookup("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());

        let api_base_url = lookup("API_BASE_URL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let debug_routes = lookup("DEBUG_ROUTES")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Config {
            port,
            database_path,
            api_base_url,
            debug_routes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.database_path, "data.sqlite");
        assert_eq!(cfg.api_base_url, "http://localhost:3000");
        assert!(!cfg.debug_routes);
    }

    #[test]
    fn test_base_url_follows_port() {
        let cfg = config(&[("PORT", "8080")]).unwrap();
        assert_eq!(cfg.api_base_url, "http://localhost:8080");

        let cfg = config(&[("PORT", "8080"), ("API_BASE_URL", "https://pixels.example")]).unwrap();
        assert_eq!(cfg.api_base_url, "https://pixels.example");
    }

    #[test]
    fn test_debug_flag() {
        assert!(config(&[("DEBUG_ROUTES", "1")]).unwrap().debug_routes);
        assert!(config(&[("DEBUG_ROUTES", "true")]).unwrap().debug_routes);
        assert!(!config(&[("DEBUG_ROUTES", "yes")]).unwrap().debug_routes);
    }

    #[test]
    fn test_bad_port() {
        assert!(matches!(
            config(&[("PORT", "http")]),
            Err(ConfigError::InvalidPort(_))
        ));
    }
}
