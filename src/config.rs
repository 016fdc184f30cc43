//! Runtime settings, read from the environment once at startup.

use std::env;

/// Days of availability projected from today, today included.
pub const DEFAULT_HORIZON_DAYS: u32 = 15;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub port: u16,
    pub horizon_days: u32,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_display_name: String,
    /// Executor accounts created at startup. Skipped without
    /// `seed_executor_password`.
    pub seed_studio_email: Option<String>,
    pub seed_studio_name: String,
    pub seed_photographer_email: Option<String>,
    pub seed_executor_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/studio_booking.db".to_string(),
            max_connections: 5,
            port: 8080,
            horizon_days: DEFAULT_HORIZON_DAYS,
            admin_email: "admin@example.com".to_string(),
            admin_password: "admin".to_string(),
            admin_display_name: "Administrator".to_string(),
            seed_studio_email: None,
            seed_studio_name: "Studio".to_string(),
            seed_photographer_email: None,
            seed_executor_password: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            horizon_days: parsed(&lookup, "SLOT_HORIZON_DAYS")
                .filter(|days| *days > 0)
                .unwrap_or(defaults.horizon_days),
            admin_email: lookup("ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            admin_password: lookup("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            admin_display_name: lookup("ADMIN_DISPLAY_NAME").unwrap_or(defaults.admin_display_name),
            seed_studio_email: non_empty(lookup("SEED_STUDIO_EMAIL")),
            seed_studio_name: non_empty(lookup("SEED_STUDIO_NAME")).unwrap_or(defaults.seed_studio_name),
            seed_photographer_email: non_empty(lookup("SEED_PHOTOGRAPHER_EMAIL")),
            seed_executor_password: non_empty(lookup("SEED_EXECUTOR_PASSWORD")),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring invalid {key}={raw}");
            None
        }
    }
}
