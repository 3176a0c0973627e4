//! Process-wide runtime configuration.
//!
//! Built once at startup and shared read-only as `Arc<RuntimeConfig>`.
//! Nothing below the CLI layer reads the environment directly.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default source root.
pub const DEFAULT_BASE_URL: &str = "https://www.nseindia.com";

/// Ceiling applied to every configured timeout and delay.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Immutable configuration consumed by the harvester and its tiers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Source root, without a trailing slash.
    pub base_url: String,
    /// Whether the browser-render tier may run at all.
    pub browser_enabled: bool,
    /// Explicit browser binary; `None` means auto-detect.
    pub chromium_path: Option<PathBuf>,
    /// Upper bound on concurrently running browser instances.
    pub max_browsers: usize,
    /// Timeout for a single HTTP request.
    pub http_timeout: Duration,
    /// Wall-clock budget for an API or static-HTML tier attempt.
    pub tier_timeout: Duration,
    /// Wall-clock budget for a browser tier attempt.
    pub browser_timeout: Duration,
    /// Session re-primes allowed after a block signal.
    pub block_retries: u32,
    /// Pause after hitting the root page while priming.
    pub prime_delay: Duration,
    /// Randomized delays and pointer simulation in the browser tier.
    pub humanize: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            browser_enabled: true,
            chromium_path: None,
            max_browsers: 2,
            http_timeout: Duration::from_secs(20),
            tier_timeout: Duration::from_secs(45),
            browser_timeout: Duration::from_secs(150),
            block_retries: 1,
            prime_delay: Duration::from_millis(1500),
            humanize: true,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from the process environment.
    ///
    /// Reads an optional `.env` file first. Unset variables keep their
    /// defaults; set-but-invalid variables are an error.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("FILINGSCOPE_BASE_URL") {
            url::Url::parse(&url).with_context(|| format!("FILINGSCOPE_BASE_URL is not a URL: {url}"))?;
            cfg.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("FILINGSCOPE_BROWSER_ENABLED") {
            cfg.browser_enabled = parse_flag("FILINGSCOPE_BROWSER_ENABLED", &v)?;
        }
        if let Some(v) = get("FILINGSCOPE_CHROMIUM_PATH") {
            cfg.chromium_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("FILINGSCOPE_MAX_BROWSERS") {
            cfg.max_browsers = parse_num::<usize>("FILINGSCOPE_MAX_BROWSERS", &v)?;
            if cfg.max_browsers == 0 {
                bail!("FILINGSCOPE_MAX_BROWSERS must be at least 1");
            }
        }
        if let Some(v) = get("FILINGSCOPE_HTTP_TIMEOUT_SECS") {
            cfg.http_timeout = clamp(
                "FILINGSCOPE_HTTP_TIMEOUT_SECS",
                Duration::from_secs(parse_num("FILINGSCOPE_HTTP_TIMEOUT_SECS", &v)?),
            );
        }
        if let Some(v) = get("FILINGSCOPE_TIER_TIMEOUT_SECS") {
            cfg.tier_timeout = clamp(
                "FILINGSCOPE_TIER_TIMEOUT_SECS",
                Duration::from_secs(parse_num("FILINGSCOPE_TIER_TIMEOUT_SECS", &v)?),
            );
        }
        if let Some(v) = get("FILINGSCOPE_BROWSER_TIMEOUT_SECS") {
            cfg.browser_timeout = clamp(
                "FILINGSCOPE_BROWSER_TIMEOUT_SECS",
                Duration::from_secs(parse_num("FILINGSCOPE_BROWSER_TIMEOUT_SECS", &v)?),
            );
        }
        if let Some(v) = get("FILINGSCOPE_BLOCK_RETRIES") {
            cfg.block_retries = parse_num("FILINGSCOPE_BLOCK_RETRIES", &v)?;
        }
        if let Some(v) = get("FILINGSCOPE_PRIME_DELAY_MS") {
            cfg.prime_delay = clamp(
                "FILINGSCOPE_PRIME_DELAY_MS",
                Duration::from_millis(parse_num("FILINGSCOPE_PRIME_DELAY_MS", &v)?),
            );
        }
        if let Some(v) = get("FILINGSCOPE_HUMANIZE") {
            cfg.humanize = parse_flag("FILINGSCOPE_HUMANIZE", &v)?;
        }

        Ok(cfg)
    }

    /// Absolute URL for a path on the source.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key} must be a boolean, got {other:?}"),
    }
}

/// Deadlines are computed by adding these durations to `Instant::now()`,
/// which panics on overflow.
fn clamp(key: &str, value: Duration) -> Duration {
    if value > MAX_TIMEOUT {
        tracing::warn!(
            key,
            requested_secs = value.as_secs(),
            "clamping to {}s",
            MAX_TIMEOUT.as_secs()
        );
        MAX_TIMEOUT
    } else {
        value
    }
}

fn parse_num<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .with_context(|| format!("{key} must be a non-negative integer, got {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let cfg = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert!(cfg.browser_enabled);
        assert_eq!(cfg.block_retries, 1);
        assert_eq!(cfg.max_browsers, 2);
    }

    #[test]
    fn test_overrides() {
        let cfg = RuntimeConfig::from_lookup(lookup(&[
            ("FILINGSCOPE_BASE_URL", "http://127.0.0.1:9000/"),
            ("FILINGSCOPE_BROWSER_ENABLED", "off"),
            ("FILINGSCOPE_CHROMIUM_PATH", "/opt/chrome/chrome"),
            ("FILINGSCOPE_MAX_BROWSERS", "4"),
            ("FILINGSCOPE_PRIME_DELAY_MS", "0"),
            ("FILINGSCOPE_HUMANIZE", "no"),
        ]))
        .unwrap();
        assert_eq!(cfg.base_url, "http://127.0.0.1:9000");
        assert!(!cfg.browser_enabled);
        assert_eq!(cfg.chromium_path, Some(PathBuf::from("/opt/chrome/chrome")));
        assert_eq!(cfg.max_browsers, 4);
        assert_eq!(cfg.prime_delay, Duration::ZERO);
        assert!(!cfg.humanize);
        assert_eq!(cfg.url("/api/x"), "http://127.0.0.1:9000/api/x");
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let err = RuntimeConfig::from_lookup(lookup(&[("FILINGSCOPE_BROWSER_ENABLED", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("FILINGSCOPE_BROWSER_ENABLED"));

        assert!(RuntimeConfig::from_lookup(lookup(&[("FILINGSCOPE_MAX_BROWSERS", "0")])).is_err());
        assert!(RuntimeConfig::from_lookup(lookup(&[("FILINGSCOPE_BLOCK_RETRIES", "-1")])).is_err());
        assert!(RuntimeConfig::from_lookup(lookup(&[("FILINGSCOPE_BASE_URL", "not a url")])).is_err());
    }

    #[test]
    fn test_huge_timeouts_are_clamped() {
        let cfg = RuntimeConfig::from_lookup(lookup(&[
            ("FILINGSCOPE_HTTP_TIMEOUT_SECS", "18446744073709551615"),
            ("FILINGSCOPE_TIER_TIMEOUT_SECS", "18446744073709551615"),
            ("FILINGSCOPE_BROWSER_TIMEOUT_SECS", "18446744073709551615"),
            ("FILINGSCOPE_PRIME_DELAY_MS", "18446744073709551615"),
        ]))
        .unwrap();
        assert_eq!(cfg.http_timeout, MAX_TIMEOUT);
        assert_eq!(cfg.tier_timeout, MAX_TIMEOUT);
        assert_eq!(cfg.browser_timeout, MAX_TIMEOUT);
        assert_eq!(cfg.prime_delay, MAX_TIMEOUT);

        let cfg = RuntimeConfig::from_lookup(lookup(&[("FILINGSCOPE_BROWSER_TIMEOUT_SECS", "90")])).unwrap();
        assert_eq!(cfg.browser_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let cfg = RuntimeConfig::from_lookup(lookup(&[("FILINGSCOPE_MAX_BROWSERS", "  ")])).unwrap();
        assert_eq!(cfg.max_browsers, 2);
    }
}
