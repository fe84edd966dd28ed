use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

const DEVELOPMENT_JWT_SECRET: &str = "jinx-development-secret-change-me";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rituals: RitualConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env(environment)?,
            rituals: RitualConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Postgres connection settings and pool bounds.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = match env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => {
                let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
                let port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
                let user = env::var("DB_USER").unwrap_or_else(|_| "jinx".to_string());
                let password =
                    env::var("DB_PASSWORD").unwrap_or_else(|_| "jinx_password".to_string());
                let name = env::var("DB_NAME").unwrap_or_else(|_| "jinx_db".to_string());
                format!("postgres://{user}:{password}@{host}:{port}/{name}?sslmode=disable")
            }
        };

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "25".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidPoolSize)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidPoolSize);
        }

        Ok(Self {
            url,
            max_connections,
            min_connections: max_connections.min(5),
            max_lifetime: Duration::from_secs(5 * 60),
            idle_timeout: Duration::from_secs(5 * 60),
        })
    }
}

// The DSN carries the password.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("max_lifetime", &self.max_lifetime)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

/// Token signing settings.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_ttl: chrono::Duration,
    pub refresh_ttl: chrono::Duration,
}

impl AuthConfig {
    fn from_env(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingJwtSecret)
            }
            _ => DEVELOPMENT_JWT_SECRET.to_string(),
        };

        Ok(Self {
            jwt_secret,
            access_ttl: chrono::Duration::hours(24),
            refresh_ttl: chrono::Duration::days(7),
        })
    }

    /// Development defaults, handy for tests and `serve --in-memory`.
    pub fn development() -> Self {
        Self {
            jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
            access_ttl: chrono::Duration::hours(24),
            refresh_ttl: chrono::Duration::days(7),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Placement of the nightly ritual window.
#[derive(Debug, Clone, Copy)]
pub struct RitualConfig {
    pub utc_offset: FixedOffset,
}

impl RitualConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let hours = env::var("RITUAL_UTC_OFFSET_HOURS")
            .unwrap_or_else(|_| "0".to_string())
            .parse::<i32>()
            .map_err(|_| ConfigError::InvalidRitualOffset)?;
        let utc_offset = hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::InvalidRitualOffset)?;
        Ok(Self { utc_offset })
    }
}

impl Default for RitualConfig {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPoolSize,
    MissingJwtSecret,
    InvalidRitualOffset,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPoolSize => {
                write!(f, "DB_MAX_CONNECTIONS must be a positive integer")
            }
            ConfigError::MissingJwtSecret => {
                write!(f, "JWT_SECRET must be set when APP_ENV=production")
            }
            ConfigError::InvalidRitualOffset => {
                write!(f, "RITUAL_UTC_OFFSET_HOURS must be an hour offset between -23 and 23")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
