//! Base config: Telegram connection, access control, logging, database. Loaded from env.

use anyhow::Result;
use std::env;

pub const DEFAULT_DATABASE_URL: &str = "./data/meal_planner.db";
pub const DEFAULT_LOG_FILE: &str = "logs/meal-planner.log";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct BaseConfig {
    /// BOT_TOKEN; only `run` needs it.
    pub bot_token: Option<String>,
    /// TELEGRAM_API_URL or TELOXIDE_API_URL
    pub telegram_api_url: Option<String>,
    pub log_file: String,
    /// SQLite file path; a `sqlite:` or `file:` prefix is accepted.
    pub database_url: String,
    /// TELEGRAM_ALLOWED_USER_IDS; empty means everyone.
    pub allowed_user_ids: Vec<i64>,
    /// ADMIN_TELEGRAM_ID: receives `/metrics` and token alerts.
    pub admin_telegram_id: Option<i64>,
    /// REQUEST_TIMEOUT_SECS: deadline for one inbound update.
    pub request_timeout_secs: u64,
}

impl BaseConfig {
    /// Load from environment variables. `token` overrides BOT_TOKEN if provided.
    pub fn load(token: Option<String>) -> Result<Self> {
        let bot_token = token
            .or_else(|| env::var("BOT_TOKEN").ok())
            .filter(|t| !t.trim().is_empty());
        let telegram_api_url = env::var("TELEGRAM_API_URL")
            .or_else(|_| env::var("TELOXIDE_API_URL"))
            .ok()
            .filter(|s| !s.trim().is_empty());
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let allowed_user_ids = match env::var("TELEGRAM_ALLOWED_USER_IDS") {
            Ok(raw) => parse_id_list(&raw)?,
            Err(_) => Vec::new(),
        };
        let admin_telegram_id = match env::var("ADMIN_TELEGRAM_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse().map_err(|_| {
                anyhow::anyhow!("ADMIN_TELEGRAM_ID must be a numeric user id, got '{}'", raw)
            })?),
            _ => None,
        };
        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Ok(Self {
            bot_token,
            telegram_api_url,
            log_file,
            database_url,
            allowed_user_ids,
            admin_telegram_id,
            request_timeout_secs,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(ref url_str) = self.telegram_api_url {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!(
                    "TELEGRAM_API_URL (or TELOXIDE_API_URL) is set but not a valid URL: {}",
                    url_str
                );
            }
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }

    pub fn require_bot_token(&self) -> Result<&str> {
        self.bot_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("BOT_TOKEN not set (or pass --token)"))
    }

    /// Filesystem path of the database.
    pub fn database_path(&self) -> &str {
        let url = self.database_url.as_str();
        let url = url.strip_prefix("sqlite://").unwrap_or(url);
        let url = url.strip_prefix("sqlite:").unwrap_or(url);
        url.strip_prefix("file:").unwrap_or(url)
    }
}

fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| anyhow::anyhow!("TELEGRAM_ALLOWED_USER_IDS contains a non-numeric id '{}'", s))
        })
        .collect()
}
