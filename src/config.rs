use std::time::Duration;

use url::Url;

use crate::models::page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::models::GroupBinding;

#[derive(Debug, Clone)]
pub struct Config {
    /// Backend origin, e.g. `http://127.0.0.1:8080`.
    pub base_url: Url,
    /// Prefix of the management API on that origin. Default: `/admin`.
    pub api_prefix: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sign in as a viewer with an API key instead of a password.
    pub api_key: Option<String>,
    /// Pre-issued bearer token; skips the login call entirely.
    pub token: Option<String>,
    pub timeout: Duration,
    /// Content downloads can be large videos, so they get their own budget.
    pub content_timeout: Duration,
    pub content_retries: u32,
    pub page_size: u32,
    pub poll: PollCadence,
    pub key_group_policy: GroupBinding,
    pub log_json: bool,
}

/// Refresh intervals of the three kinds of pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCadence {
    pub dashboard: Duration,
    pub list: Duration,
    pub record: Duration,
}

impl Default for PollCadence {
    fn default() -> Self {
        Self {
            dashboard: Duration::from_secs(15),
            list: Duration::from_secs(10),
            record: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Defaults for a backend at `base_url`, without reading the environment.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_prefix: "/admin".into(),
            username: None,
            password: None,
            api_key: None,
            token: None,
            timeout: Duration::from_secs(30),
            content_timeout: Duration::from_secs(120),
            content_retries: 3,
            page_size: DEFAULT_PAGE_SIZE,
            poll: PollCadence::default(),
            key_group_policy: GroupBinding::Optional,
            log_json: false,
        }
    }
}

fn env_secs(name: &str, default: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let raw_url =
        std::env::var("SORA_CONSOLE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".into());
    let base_url = Url::parse(raw_url.trim())
        .map_err(|e| anyhow::anyhow!("SORA_CONSOLE_URL '{}' is not a valid URL: {}", raw_url, e))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        anyhow::bail!("SORA_CONSOLE_URL must be an http(s) URL, got '{}'", raw_url);
    }

    let key_group_policy = match env_opt("SORA_CONSOLE_KEY_GROUP_POLICY") {
        Some(raw) => raw
            .parse::<GroupBinding>()
            .map_err(|e| anyhow::anyhow!("SORA_CONSOLE_KEY_GROUP_POLICY: {}", e))?,
        None => GroupBinding::Optional,
    };

    let mut config = Config::new(base_url);
    config.api_prefix = normalize_prefix(
        &std::env::var("SORA_CONSOLE_API_PREFIX").unwrap_or_else(|_| "/admin".into()),
    );
    config.username = env_opt("SORA_CONSOLE_USERNAME");
    config.password = env_opt("SORA_CONSOLE_PASSWORD");
    config.api_key = env_opt("SORA_CONSOLE_API_KEY");
    config.token = env_opt("SORA_CONSOLE_TOKEN");
    config.timeout = env_secs("SORA_CONSOLE_TIMEOUT_SECS", 30);
    config.content_timeout = env_secs("SORA_CONSOLE_CONTENT_TIMEOUT_SECS", 120);
    config.content_retries = std::env::var("SORA_CONSOLE_CONTENT_RETRIES")
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(3);
    config.page_size = std::env::var("SORA_CONSOLE_PAGE_SIZE")
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    config.poll = PollCadence {
        dashboard: env_secs("SORA_CONSOLE_DASHBOARD_POLL_SECS", 15),
        list: env_secs("SORA_CONSOLE_LIST_POLL_SECS", 10),
        record: env_secs("SORA_CONSOLE_RECORD_POLL_SECS", 5),
    };
    config.key_group_policy = key_group_policy;
    config.log_json = std::env::var("SORA_CONSOLE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    Ok(config)
}
