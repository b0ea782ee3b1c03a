use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub binance_spot_url: String,
    pub binance_futures_url: String,

    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,

    pub scheduler: SchedulerSettings,
    pub scheduler_autostart: bool,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub tick_interval: Duration,
    pub alert_concurrency: usize,
    // per market fetch / notification send
    pub alert_timeout: Duration,
    pub store_timeout: Duration,
    // half-width of the "At Specific Time" window
    pub specific_time_tolerance_secs: i64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            alert_concurrency: 8,
            alert_timeout: Duration::from_millis(5_000),
            store_timeout: Duration::from_millis(3_000),
            specific_time_tolerance_secs: 30,
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let defaults = SchedulerSettings::default();

    let scheduler = SchedulerSettings {
        tick_interval: Duration::from_millis(parsed_or("TICK_INTERVAL_MS", 1_000u64).max(1)),
        alert_concurrency: parsed_or("ALERT_CONCURRENCY", defaults.alert_concurrency).max(1),
        alert_timeout: Duration::from_millis(parsed_or("ALERT_TIMEOUT_MS", 5_000u64)),
        store_timeout: Duration::from_millis(parsed_or("STORE_TIMEOUT_MS", 3_000u64)),
        specific_time_tolerance_secs: parsed_or(
            "SPECIFIC_TIME_TOLERANCE_SECS",
            defaults.specific_time_tolerance_secs,
        )
        .max(0),
    };

    Settings {
        mongodb_uri: var_or("MONGODB_URI", "mongodb://localhost:27017"),
        mongodb_db: var_or("MONGODB_DB", "crypto_alerts"),
        host: var_or("HOST", "127.0.0.1"),
        port: parsed_or("PORT", 3000),

        binance_spot_url: var_or("BINANCE_SPOT_URL", "https://api.binance.com"),
        binance_futures_url: var_or("BINANCE_FUTURES_URL", "https://fapi.binance.com"),

        smtp_host: var_or("SMTP_HOST", "localhost"),
        smtp_port: parsed_or("SMTP_PORT", 587),
        smtp_username: optional("SMTP_USERNAME"),
        smtp_password: optional("SMTP_PASSWORD"),
        smtp_from: var_or("SMTP_FROM", "alerts@localhost"),

        scheduler,
        scheduler_autostart: parsed_or("SCHEDULER_AUTOSTART", true),
    }
}
