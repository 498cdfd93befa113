use crate::engine::DEFAULT_MAX_UPLINE_DEPTH;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Hard bound on upline traversal depth; the safety valve against a
    /// corrupted or cyclic referral graph.
    pub max_upline_depth: u8,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let max_upline_depth = match env_map.get("MAX_UPLINE_DEPTH") {
            Some(s) => s.parse::<u8>().map_err(|_| {
                ConfigError::InvalidValue(
                    "MAX_UPLINE_DEPTH".to_string(),
                    "must be a valid u8".to_string(),
                )
            })?,
            None => DEFAULT_MAX_UPLINE_DEPTH,
        };

        Ok(Config {
            port,
            database_path,
            max_upline_depth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_default_max_upline_depth() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.max_upline_depth, DEFAULT_MAX_UPLINE_DEPTH);
    }

    #[test]
    fn test_custom_max_upline_depth() {
        let mut env_map = setup_required_env();
        env_map.insert("MAX_UPLINE_DEPTH".to_string(), "3".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.max_upline_depth, 3);
    }

    #[test]
    fn test_invalid_max_upline_depth() {
        let mut env_map = setup_required_env();
        env_map.insert("MAX_UPLINE_DEPTH".to_string(), "-1".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "MAX_UPLINE_DEPTH"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
