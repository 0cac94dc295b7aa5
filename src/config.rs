//! Application configuration loaded from environment variables.
//!
//! Every setting has a local-development default, so the tracker starts
//! against the dev proxy without any environment at all.

use std::env;
use std::path::PathBuf;

/// Default backend endpoint: the local development proxy in front of Supabase.
pub const DEFAULT_SUPABASE_URL: &str = "http://localhost:5174/api";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Supabase project (auth at `/auth/v1`, tables at `/rest/v1`)
    pub supabase_url: String,
    /// Public (anon) API key sent with every backend request
    pub supabase_anon_key: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Where to persist the auth session between runs (disabled when unset)
    pub session_file: Option<PathBuf>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            supabase_url: DEFAULT_SUPABASE_URL.to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            session_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let supabase_url = env::var("SUPABASE_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SUPABASE_URL.to_string());

        reqwest::Url::parse(&supabase_url)
            .map_err(|e| ConfigError::Invalid("SUPABASE_URL", e.to_string()))?;

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            session_file: env::var("SESSION_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-wide, so everything touching them lives in one test.
    #[test]
    fn test_config_from_env() {
        env::remove_var("SUPABASE_URL");
        env::remove_var("SUPABASE_ANON_KEY");
        env::remove_var("SESSION_FILE");
        env::remove_var("PORT");

        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.supabase_url, DEFAULT_SUPABASE_URL);
        assert_eq!(config.supabase_anon_key, "");
        assert_eq!(config.port, 8080);
        assert!(config.session_file.is_none());

        env::set_var("SUPABASE_URL", "https://example.supabase.co/");
        env::set_var("SUPABASE_ANON_KEY", " anon ");
        env::set_var("SESSION_FILE", "/tmp/peak-session.json");

        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.supabase_url, "https://example.supabase.co");
        assert_eq!(config.supabase_anon_key, "anon");
        assert_eq!(
            config.session_file,
            Some(PathBuf::from("/tmp/peak-session.json"))
        );

        env::set_var("SUPABASE_URL", "not a url");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("SUPABASE_URL", _))
        ));

        env::remove_var("SUPABASE_URL");
        env::remove_var("SUPABASE_ANON_KEY");
        env::remove_var("SESSION_FILE");
    }
}
