//! Configuration module
//!
//! Settings are read from the environment (after loading `.env` with dotenvy).
//! [`Config::from_lookup`] accepts any key lookup so parsing can be exercised
//! without touching the process environment.

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Duration;

use crate::auth::SchemeKind;
use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 3000;
const FILE_EXPIRE_SECONDS: i64 = 600;
const MAX_FILE_EXPIRE_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;
const LOCAL_STORAGE_PATH: &str = "./data";
const DB_PORT: u16 = 5432;
const DB_USER: &str = "postgres";
const DB_NAME: &str = "ephemera";

/// Log output format for the binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    environment: String,
    server_port: u16,
    file_expire: Duration,
    password_scheme: SchemeKind,
    storage_backend: StorageBackend,
    local_storage_path: PathBuf,
    database_url: Option<String>,
    db_max_connections: u32,
    db_timeout_seconds: u64,
    max_file_size_bytes: usize,
    cors_origins: Vec<String>,
    log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let server_port = parse_or(var("SERVER_PORT"), "SERVER_PORT", SERVER_PORT)?;

        let expire_secs: i64 = parse_or(
            var("FILE_EXPIRE_SECONDS"),
            "FILE_EXPIRE_SECONDS",
            FILE_EXPIRE_SECONDS,
        )?;
        if expire_secs <= 0 || expire_secs > MAX_FILE_EXPIRE_SECONDS {
            return Err(anyhow::anyhow!(
                "FILE_EXPIRE_SECONDS must be between 1 and {}",
                MAX_FILE_EXPIRE_SECONDS
            ));
        }
        let file_expire = Duration::try_seconds(expire_secs)
            .ok_or_else(|| anyhow::anyhow!("FILE_EXPIRE_SECONDS out of range: {}", expire_secs))?;

        let password_scheme = match var("PASSWORD_SCHEME") {
            Some(raw) => raw.parse::<SchemeKind>()?,
            None => SchemeKind::default(),
        };

        let storage_backend = match var("STORAGE_BACKEND") {
            Some(raw) => raw.parse::<StorageBackend>()?,
            None => StorageBackend::Local,
        };

        let local_storage_path = var("LOCAL_STORAGE_PATH")
            .unwrap_or_else(|| LOCAL_STORAGE_PATH.to_string())
            .into();

        let database_url = var("DATABASE_URL").or_else(|| {
            var("DB_HOST").map(|host| {
                let port = var("DB_PORT").unwrap_or_else(|| DB_PORT.to_string());
                let user = var("DB_USER").unwrap_or_else(|| DB_USER.to_string());
                let password = var("DB_PASSWORD").unwrap_or_default();
                let name = var("DB_NAME").unwrap_or_else(|| DB_NAME.to_string());
                format!(
                    "postgresql://{}:{}@{}:{}/{}",
                    urlencoding::encode(&user),
                    urlencoding::encode(&password),
                    host,
                    port,
                    name
                )
            })
        });

        let db_max_connections = parse_or(
            var("DB_MAX_CONNECTIONS"),
            "DB_MAX_CONNECTIONS",
            MAX_CONNECTIONS,
        )?;
        let db_timeout_seconds = parse_or(
            var("DB_TIMEOUT_SECONDS"),
            "DB_TIMEOUT_SECONDS",
            CONNECTION_TIMEOUT_SECS,
        )?;
        let max_file_size_bytes = parse_or(
            var("MAX_FILE_SIZE_BYTES"),
            "MAX_FILE_SIZE_BYTES",
            MAX_FILE_SIZE_BYTES,
        )?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_format = match var("LOG_FORMAT").map(|v| v.to_lowercase()).as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(anyhow::anyhow!("Invalid LOG_FORMAT: {}", other)),
        };

        let config = Config {
            environment,
            server_port,
            file_expire,
            password_scheme,
            storage_backend,
            local_storage_path,
            database_url,
            db_max_connections,
            db_timeout_seconds,
            max_file_size_bytes,
            cors_origins,
            log_format,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.storage_backend == StorageBackend::Postgres {
            match self.database_url.as_deref() {
                Some(url)
                    if url.starts_with("postgres://") || url.starts_with("postgresql://") => {}
                Some(_) => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                None => {
                    return Err(anyhow::anyhow!(
                        "STORAGE_BACKEND=postgres requires DATABASE_URL or DB_HOST to be set"
                    ))
                }
            }
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_BYTES must be greater than zero"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    /// Time-to-live applied to every stored file.
    pub fn file_expire(&self) -> Duration {
        self.file_expire
    }

    pub fn password_scheme(&self) -> SchemeKind {
        self.password_scheme
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend
    }

    pub fn local_storage_path(&self) -> &PathBuf {
        &self.local_storage_path
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.db_timeout_seconds
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_bytes
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, anyhow::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("Invalid value for {}: {}", key, value)),
        None => Ok(default),
    }
}
