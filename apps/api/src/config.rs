use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_api_url: String,
    pub backend_api_token: Option<String>,
    pub backend_timeout_secs: u64,
    /// Upper bound on in-flight per-candidate lookups during one fan-out.
    pub lookup_concurrency: usize,
    /// chrono format used for the `created_at` column of the candidate board.
    pub display_date_format: String,
    pub port: u16,
    pub rust_log: String,
}

pub const DEFAULT_DISPLAY_DATE_FORMAT: &str = "%-m/%-d/%Y";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            backend_api_url: require_env("BACKEND_API_URL")?
                .trim_end_matches('/')
                .to_string(),
            backend_api_token: std::env::var("BACKEND_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            backend_timeout_secs: parse_env("BACKEND_TIMEOUT_SECS", 30)?,
            lookup_concurrency: parse_env::<usize>("LOOKUP_CONCURRENCY", 8)?.max(1),
            display_date_format: std::env::var("DISPLAY_DATE_FORMAT")
                .unwrap_or_else(|_| DEFAULT_DISPLAY_DATE_FORMAT.to_string()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_api_url: "http://localhost:8000/api/v1".to_string(),
            backend_api_token: None,
            backend_timeout_secs: 30,
            lookup_concurrency: 8,
            display_date_format: DEFAULT_DISPLAY_DATE_FORMAT.to_string(),
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
