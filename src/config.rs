use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::fmt;

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub log_level: String,
    pub auto_migrate_optional_columns: bool,
    pub request_timeout_secs: u64,
}

impl Config {
    fn from_env() -> Self {
        dotenv().ok();

        Self {
            port: env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "memory://".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            auto_migrate_optional_columns: env::var("AUTO_MIGRATE_OPTIONAL_COLUMNS")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}

// The connection string may carry credentials.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database_url", &"<redacted>")
            .field("log_level", &self.log_level)
            .field("auto_migrate_optional_columns", &self.auto_migrate_optional_columns)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

// Global static accessible everywhere
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
