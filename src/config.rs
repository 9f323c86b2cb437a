//! Runtime configuration parsed from environment variables.

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
pub const DEFAULT_STOCK_WARNING_MULTIPLE: f64 = 1.2;
pub const DEFAULT_LOYALTY_POINTS_PER_DOLLAR: i64 = 1;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// Lifetime of a login session.
    pub session_ttl_hours: i64,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
    /// Stock at or below `threshold * multiple` is flagged as a warning.
    pub stock_warning_multiple: f64,
    /// Insert demo catalogue/stock/owner rows on an empty database.
    pub seed_demo_data: bool,
    pub loyalty_points_per_dollar: i64,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `SESSION_TTL_HOURS`: default 24
    /// - `COOKIE_SECURE`: default false
    /// - `STOCK_WARNING_MULTIPLE`: default 1.2
    /// - `SEED_DEMO_DATA`: default false
    /// - `LOYALTY_POINTS_PER_DOLLAR`: default 1
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` when `DATABASE_URL` is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let stock_warning_multiple =
            env_parse("STOCK_WARNING_MULTIPLE", DEFAULT_STOCK_WARNING_MULTIPLE);

        Ok(Self {
            database_url,
            port: env_parse("PORT", DEFAULT_PORT),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            session_ttl_hours: env_parse("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS).max(1),
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
            stock_warning_multiple: if stock_warning_multiple >= 1.0 {
                stock_warning_multiple
            } else {
                DEFAULT_STOCK_WARNING_MULTIPLE
            },
            seed_demo_data: env_bool("SEED_DEMO_DATA").unwrap_or(false),
            loyalty_points_per_dollar: env_parse("LOYALTY_POINTS_PER_DOLLAR", DEFAULT_LOYALTY_POINTS_PER_DOLLAR).max(0),
        })
    }

    /// Defaults for everything except the database URL.
    #[must_use]
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            port: DEFAULT_PORT,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            cookie_secure: false,
            stock_warning_multiple: DEFAULT_STOCK_WARNING_MULTIPLE,
            seed_demo_data: false,
            loyalty_points_per_dollar: DEFAULT_LOYALTY_POINTS_PER_DOLLAR,
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
