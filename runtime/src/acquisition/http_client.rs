//! Primed HTTP session for the source.
//!
//! Not a browser: a reqwest client with a browser-like header set and a
//! cookie jar. Priming visits the home page (and one common page) so the
//! anti-bot cookies are present before any data request. A 401/403 on a
//! request that allows retries re-primes the session and tries again.

use crate::config::RuntimeConfig;
use crate::error::FetchError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                              AppleWebKit/537.36 (KHTML, like Gecko) \
                              Chrome/124.0.0.0 Safari/537.36";

const DEFAULT_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,\
         image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("accept-language", "en-US,en;q=0.9"),
    ("connection", "keep-alive"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("cache-control", "max-age=0"),
];

/// Second page visited while priming to build navigation history.
const WARM_PATH: &str = "/market-data";

/// An HTTP client that looks like a returning browser visitor.
pub struct Session {
    client: reqwest::Client,
    config: Arc<RuntimeConfig>,
    refreshes: AtomicU32,
}

impl Session {
    /// Build an unprimed session.
    pub fn new(config: Arc<RuntimeConfig>) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for &(name, value) in DEFAULT_HEADERS {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .timeout(config.http_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            config,
            refreshes: AtomicU32::new(0),
        })
    }

    /// Build a session and collect the source's cookies. Priming failures
    /// are logged and swallowed: the session is still usable.
    pub async fn prime(config: Arc<RuntimeConfig>) -> Result<Self, FetchError> {
        let session = Self::new(config)?;
        session.visit("/").await;
        tokio::time::sleep(session.config.prime_delay).await;
        session.visit(WARM_PATH).await;
        tokio::time::sleep(session.config.prime_delay / 3).await;
        Ok(session)
    }

    /// Re-prime in place after a block signal.
    pub async fn refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        self.visit("/").await;
        tokio::time::sleep(self.config.prime_delay * 2 / 3).await;
    }

    /// Number of re-primes performed so far.
    pub fn refresh_count(&self) -> u32 {
        self.refreshes.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    async fn visit(&self, path: &str) {
        match self.client.get(self.config.url(path)).send().await {
            Ok(resp) => debug!("priming {path}: HTTP {}", resp.status().as_u16()),
            Err(e) => warn!("priming {path} failed: {}", e.without_url()),
        }
    }

    /// GET a JSON endpoint as an XHR from `referer`. A block signal is
    /// reported immediately; the caller falls through to the next tier.
    pub async fn get_json(
        &self,
        path: &str,
        params: &[(&str, String)],
        referer: &str,
    ) -> Result<Value, FetchError> {
        let headers = [
            ("accept", "application/json, text/plain, */*"),
            ("referer", referer),
            ("x-requested-with", "XMLHttpRequest"),
            ("sec-fetch-dest", "empty"),
            ("sec-fetch-mode", "cors"),
            ("sec-fetch-site", "same-origin"),
        ];
        let body = self.get_text(path, params, &headers, 0).await?;
        serde_json::from_str(&body)
            .map_err(|e| FetchError::ParseMiss(format!("{path} did not return JSON: {e}")))
    }

    /// GET an HTML page, re-priming and retrying on a block signal up to
    /// the configured budget.
    pub async fn get_html(&self, path: &str, params: &[(&str, String)]) -> Result<String, FetchError> {
        let referer = self.config.url("/");
        let headers = [("referer", referer.as_str()), ("sec-fetch-site", "same-origin")];
        self.get_text(path, params, &headers, self.config.block_retries)
            .await
    }

    async fn get_text(
        &self,
        path: &str,
        params: &[(&str, String)],
        headers: &[(&str, &str)],
        block_retries: u32,
    ) -> Result<String, FetchError> {
        let url = self.config.url(path);
        let mut attempt = 0u32;

        loop {
            let mut request = self.client.get(&url).query(params);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            let resp = request.send().await?;
            let status = resp.status().as_u16();

            if is_block_signal(status) {
                if attempt < block_retries {
                    attempt += 1;
                    warn!("{path} blocked (HTTP {status}), re-priming session ({attempt}/{block_retries})");
                    self.refresh().await;
                    tokio::time::sleep(retry_pause(&self.config)).await;
                    continue;
                }
                return Err(FetchError::Blocked { status });
            }
            if !resp.status().is_success() {
                return Err(FetchError::Transport(format!("{path} returned HTTP {status}")));
            }
            return Ok(resp.text().await?);
        }
    }
}

fn is_block_signal(status: u16) -> bool {
    status == 401 || status == 403
}

fn retry_pause(config: &RuntimeConfig) -> Duration {
    config.prime_delay + config.prime_delay / 3
}

/// A session primed on first use and shared by the tiers of one call.
pub struct LazySession {
    config: Arc<RuntimeConfig>,
    cell: OnceCell<Arc<Session>>,
}

impl LazySession {
    pub fn new(config: Arc<RuntimeConfig>) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<Arc<Session>, FetchError> {
        self.cell
            .get_or_try_init(|| async {
                Session::prime(Arc::clone(&self.config)).await.map(Arc::new)
            })
            .await
            .cloned()
    }

    /// The session, if some tier already primed it.
    pub fn primed(&self) -> Option<&Arc<Session>> {
        self.cell.get()
    }
}
