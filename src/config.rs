use std::fmt;
use std::time::Duration;

use anyhow::{Context, bail};

use crate::api::RetryPolicy;
use crate::api::session::DEFAULT_BASE_URL;

// ------------------------------------------------------------
// Root configuration
// ------------------------------------------------------------
//
// Read once from the environment at startup. No hot reload.
//
// Variables:
// - USER_TOKEN            account token (required)
// - JAEGER_URL            tracing collector endpoint (optional)
// - METRICS_PORT          port of the /metrics endpoint (9091)
// - API_BASE_URL          game API host
// - POLL_INTERVAL_MS      cycle cadence (300000 = 5 min)
// - RETRY_MAX_ATTEMPTS    attempts per request on timeout (5)
// - RETRY_DELAY_SECS      pause between attempts (10)
// - REQUEST_TIMEOUT_SECS  per-request timeout (30)
//
// Defaults match the historical hard-coded values, so only
// USER_TOKEN is needed to run.
//
#[derive(Clone)]
pub struct Config {
    /// Account token, interpolated into every request url
    pub token: String,

    /// Tracing collector endpoint
    pub trace_endpoint: Option<String>,

    pub metrics_port: u16,

    pub api_base_url: String,

    /// Target duration of one full cycle, sleep included
    pub poll_interval_ms: u64,

    pub retry_max_attempts: u32,

    pub retry_delay_secs: u64,

    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: String::new(),
            trace_endpoint: None,
            metrics_port: 9091,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: 300_000,
            retry_max_attempts: 5,
            retry_delay_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

// Token stays out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("trace_endpoint", &self.trace_endpoint)
            .field("metrics_port", &self.metrics_port)
            .field("api_base_url", &self.api_base_url)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("retry_max_attempts", &self.retry_max_attempts)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, one call per variable.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let Some(token) = get("USER_TOKEN") else {
            bail!("USER_TOKEN is not set");
        };

        let cfg = Self {
            token,
            trace_endpoint: get("JAEGER_URL"),
            metrics_port: parse_or(get("METRICS_PORT"), "METRICS_PORT", defaults.metrics_port)?,
            api_base_url: get("API_BASE_URL").unwrap_or(defaults.api_base_url),
            poll_interval_ms: parse_or(
                get("POLL_INTERVAL_MS"),
                "POLL_INTERVAL_MS",
                defaults.poll_interval_ms,
            )?,
            retry_max_attempts: parse_or(
                get("RETRY_MAX_ATTEMPTS"),
                "RETRY_MAX_ATTEMPTS",
                defaults.retry_max_attempts,
            )?,
            retry_delay_secs: parse_or(
                get("RETRY_DELAY_SECS"),
                "RETRY_DELAY_SECS",
                defaults.retry_delay_secs,
            )?,
            request_timeout_secs: parse_or(
                get("REQUEST_TIMEOUT_SECS"),
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
        };

        if cfg.retry_max_attempts == 0 {
            bail!("RETRY_MAX_ATTEMPTS must be at least 1");
        }

        Ok(cfg)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {v:?}")),
        None => Ok(default),
    }
}
