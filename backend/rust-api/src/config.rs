use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::pokeapi::ApiMode;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_MOCK_API_URL: &str = "http://localhost:3001";
pub const DEFAULT_POKEAPI_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_SCORES_FILE: &str = "data/highscores.json";
pub const DEFAULT_API_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
    Test,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub environment: Environment,
    pub port: u16,
    pub api_mode: ApiMode,
    pub mock_api_url: String,
    pub pokeapi_base_url: String,
    pub scores_file: PathBuf,
    pub api_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Dev,
            port: DEFAULT_PORT,
            api_mode: ApiMode::Real,
            mock_api_url: DEFAULT_MOCK_API_URL.to_string(),
            pokeapi_base_url: DEFAULT_POKEAPI_BASE_URL.to_string(),
            scores_file: PathBuf::from(DEFAULT_SCORES_FILE),
            api_timeout_ms: DEFAULT_API_TIMEOUT_MS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());
        let environment = parse_environment(&app_env)?;

        // config/*.toml first, then APP__* overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let port = match setting(&settings, "server.port", "PORT") {
            Some(raw) => parse_port(&raw)?,
            None => DEFAULT_PORT,
        };

        let api_mode = match setting(&settings, "pokeapi.mode", "API_MODE") {
            Some(raw) => parse_api_mode(&raw)?,
            None => ApiMode::Real,
        };

        let mock_api_url = setting(&settings, "pokeapi.mock_url", "MOCKOON_API_URL")
            .unwrap_or_else(|| DEFAULT_MOCK_API_URL.to_string());
        validate_url("MOCKOON_API_URL", &mock_api_url)?;

        let pokeapi_base_url = setting(&settings, "pokeapi.base_url", "POKEAPI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_POKEAPI_BASE_URL.to_string());
        validate_url("POKEAPI_BASE_URL", &pokeapi_base_url)?;

        let scores_file = setting(&settings, "scores.file", "SCORES_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCORES_FILE));

        let api_timeout_ms = match setting(&settings, "pokeapi.timeout_ms", "API_TIMEOUT_MS") {
            Some(raw) => raw.parse::<u64>().ok().filter(|ms| *ms > 0).ok_or_else(|| {
                config::ConfigError::Message(format!(
                    "API_TIMEOUT_MS must be a positive integer, got {:?}",
                    raw
                ))
            })?,
            None => DEFAULT_API_TIMEOUT_MS,
        };

        Ok(Config {
            environment,
            port,
            api_mode,
            mock_api_url,
            pokeapi_base_url,
            scores_file,
            api_timeout_ms,
        })
    }

    /// Base URL of the upstream selected by `api_mode`.
    pub fn data_source_url(&self) -> &str {
        match self.api_mode {
            ApiMode::Real => &self.pokeapi_base_url,
            ApiMode::Mock => &self.mock_api_url,
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }
}

/// Layered value for `key`, falling back to the plain `var` environment variable.
fn setting(settings: &config::Config, key: &str, var: &str) -> Option<String> {
    settings
        .get_string(key)
        .ok()
        .or_else(|| env::var(var).ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_environment(raw: &str) -> Result<Environment, config::ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "dev" | "development" => Ok(Environment::Dev),
        "prod" | "production" => Ok(Environment::Prod),
        "test" => Ok(Environment::Test),
        other => Err(config::ConfigError::Message(format!(
            "APP_ENV must be one of dev, prod, test; got {:?}",
            other
        ))),
    }
}

fn parse_port(raw: &str) -> Result<u16, config::ConfigError> {
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(config::ConfigError::Message(format!(
            "PORT must be between 1 and 65535, got {:?}",
            raw
        ))),
    }
}

fn parse_api_mode(raw: &str) -> Result<ApiMode, config::ConfigError> {
    match raw.to_lowercase().as_str() {
        "real" => Ok(ApiMode::Real),
        "mock" | "mockoon" => Ok(ApiMode::Mock),
        other => Err(config::ConfigError::Message(format!(
            "API_MODE must be 'real' or 'mock', got {:?}",
            other
        ))),
    }
}

fn validate_url(name: &str, raw: &str) -> Result<(), config::ConfigError> {
    url::Url::parse(raw)
        .map(|_| ())
        .map_err(|e| config::ConfigError::Message(format!("{} is not a valid URL: {}", name, e)))
}
