use crate::error::{Error, Result};
use crate::models::user::permission;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub privileged_permission: i32,
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
    pub log_format: LogFormat,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty()),
            jwt_secret: get_env("JWT_SECRET")?,
            privileged_permission: get_env_parse_or("PRIVILEGED_PERMISSION", permission::ADMIN)?,
            request_timeout_secs: get_env_parse_or("REQUEST_TIMEOUT_SECS", 5)?,
            max_body_bytes: get_env_parse_or("MAX_BODY_BYTES", 1024 * 1024)?,
            log_format: get_env_parse_or("LOG_FORMAT", LogFormat::Text)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
