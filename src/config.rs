//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Server and store
//! - `HOST` / `PORT` - Bind address (default: 0.0.0.0:8080)
//! - `STORE_BACKEND` - `postgres` (default) or `memory`
//! - `DATABASE_URL` - `PostgreSQL` connection string, required for `postgres`
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//!
//! ## Mail
//! - `SMTP_HOST` - SMTP relay; when unset, mails are only logged
//! - `SMTP_PORT` - default: 587
//! - `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM`
//!
//! ## Alert jobs
//! - `STOCK_LOW_THRESHOLD` (default: 10), `STOCK_ADMIN_EMAILS`,
//!   `STOCK_ALERT_COOLDOWN_MINUTES` (default: 60), `STOCK_JOB_INTERVAL_MS` (default: 300000)
//! - `EXPIRY_ALERT_DAYS` (default: 30), `EXPIRY_ALERT_CRON` (default: `0 9 * * *`),
//!   `ADMIN_ALERT_EMAILS`
//!
//! ## Orders
//! - `ALLOW_OVERSELL` - let stock go negative when an order exceeds it (default: false)

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    str::FromStr,
    time::Duration,
};

use thiserror::Error;

use crate::{
    jobs::cron::{CronError, CronSchedule},
    notify::parse_recipients,
};

pub const DEFAULT_EXPIRY_CRON: &str = "0 9 * * *";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub store: StoreBackend,
    /// `None` selects the logging mailer.
    pub smtp: Option<SmtpConfig>,
    pub stock: StockAlertConfig,
    pub expiry: ExpiryAlertConfig,
    pub orders: OrderConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    Memory,
}

/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("from", &self.from)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockAlertConfig {
    /// Products at or below this quantity are low on stock.
    pub low_threshold: i32,
    pub admin_emails: Vec<String>,
    pub cooldown: chrono::Duration,
    pub interval: Duration,
}

impl Default for StockAlertConfig {
    fn default() -> Self {
        Self {
            low_threshold: 10,
            admin_emails: Vec::new(),
            cooldown: chrono::Duration::minutes(60),
            interval: Duration::from_millis(300_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpiryAlertConfig {
    /// Size of the look-ahead window in days, today included.
    pub alert_days: i64,
    pub cron: CronSchedule,
    pub admin_emails: Vec<String>,
}

impl Default for ExpiryAlertConfig {
    fn default() -> Self {
        Self {
            alert_days: 30,
            cron: daily_at_nine(),
            admin_emails: Vec::new(),
        }
    }
}

fn daily_at_nine() -> CronSchedule {
    CronSchedule::daily(9, 0)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderConfig {
    pub allow_oversell: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            store: StoreBackend::Memory,
            smtp: None,
            stock: StockAlertConfig::default(),
            expiry: ExpiryAlertConfig::default(),
            orders: OrderConfig::default(),
        }
    }
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let store = match get("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres {
                database_url: get("DATABASE_URL")
                    .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?,
                max_connections: parse_or(
                    "DATABASE_MAX_CONNECTIONS",
                    get("DATABASE_MAX_CONNECTIONS"),
                    10,
                )?,
            },
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "STORE_BACKEND".to_string(),
                    format!("expected `postgres` or `memory`, got `{other}`"),
                ));
            }
        };

        let smtp = match get("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or("SMTP_PORT", get("SMTP_PORT"), 587)?,
                username: get("SMTP_USERNAME"),
                password: get("SMTP_PASSWORD"),
                from: get("SMTP_FROM")
                    .ok_or_else(|| ConfigError::MissingEnvVar("SMTP_FROM".to_string()))?,
            }),
            None => None,
        };

        let cooldown_minutes: i64 = parse_or(
            "STOCK_ALERT_COOLDOWN_MINUTES",
            get("STOCK_ALERT_COOLDOWN_MINUTES"),
            60,
        )?;
        let interval_ms: u64 =
            parse_or("STOCK_JOB_INTERVAL_MS", get("STOCK_JOB_INTERVAL_MS"), 300_000)?;
        if interval_ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOCK_JOB_INTERVAL_MS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let cron = match get("EXPIRY_ALERT_CRON") {
            Some(expr) => expr.parse().map_err(|e: CronError| {
                ConfigError::InvalidEnvVar("EXPIRY_ALERT_CRON".to_string(), e.to_string())
            })?,
            None => daily_at_nine(),
        };

        Ok(Self {
            host: parse_or("HOST", get("HOST"), IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or("PORT", get("PORT"), 8080)?,
            store,
            smtp,
            stock: StockAlertConfig {
                low_threshold: parse_or("STOCK_LOW_THRESHOLD", get("STOCK_LOW_THRESHOLD"), 10)?,
                admin_emails: parse_recipients(&get("STOCK_ADMIN_EMAILS").unwrap_or_default()),
                cooldown: chrono::Duration::minutes(cooldown_minutes),
                interval: Duration::from_millis(interval_ms),
            },
            expiry: ExpiryAlertConfig {
                alert_days: parse_or("EXPIRY_ALERT_DAYS", get("EXPIRY_ALERT_DAYS"), 30)?,
                cron,
                admin_emails: parse_recipients(&get("ADMIN_ALERT_EMAILS").unwrap_or_default()),
            },
            orders: OrderConfig {
                allow_oversell: parse_or("ALLOW_OVERSELL", get("ALLOW_OVERSELL"), false)?,
            },
        })
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
