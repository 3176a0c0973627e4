//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide), plus the
//! `RendererFactory` used by the browser tier to launch one engine per job.
//! Waiting is built on `execute_js` so every backend gets the same
//! fallback strategies.

pub mod chromium;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// Launches browser engines.
#[async_trait]
pub trait RendererFactory: Send + Sync {
    /// Start a fresh engine, headless or with a visible window.
    async fn launch(&self, headless: bool) -> Result<Box<dyn Renderer>>;
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine and wait for the process to exit.
    async fn shutdown(&self) -> Result<()>;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;
    /// Focus the first element matching `selector` and type `text` into it.
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;
    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;
    /// Press a named key (e.g. "Enter") on the element matching `selector`.
    async fn press_key(&self, selector: &str, key: &str) -> Result<()>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A condition the page must satisfy before extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitStrategy {
    /// An element with this id is present.
    ElementId(String),
    /// Any element matches this CSS selector.
    Selector(String),
    /// At least `min` elements match the selector.
    MinRows { selector: String, min: usize },
    /// An element matching the selector is present and rendered.
    Visible(String),
}

impl WaitStrategy {
    /// JS expression evaluating to `true` once the condition holds.
    pub fn probe_script(&self) -> String {
        match self {
            WaitStrategy::ElementId(id) => format!(
                "document.getElementById('{}') !== null",
                sanitize_js_string(id)
            ),
            WaitStrategy::Selector(sel) => format!(
                "document.querySelector('{}') !== null",
                sanitize_js_string(sel)
            ),
            WaitStrategy::MinRows { selector, min } => format!(
                "document.querySelectorAll('{}').length >= {min}",
                sanitize_js_string(selector)
            ),
            WaitStrategy::Visible(sel) => format!(
                r#"(() => {{
                    const el = document.querySelector('{}');
                    if (!el) return false;
                    const r = el.getBoundingClientRect();
                    return r.width > 0 && r.height > 0 && getComputedStyle(el).visibility !== 'hidden';
                }})()"#,
                sanitize_js_string(sel)
            ),
        }
    }
}

impl std::fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitStrategy::ElementId(id) => write!(f, "#{id}"),
            WaitStrategy::Selector(sel) => write!(f, "{sel}"),
            WaitStrategy::MinRows { selector, min } => write!(f, "{min}+ x {selector}"),
            WaitStrategy::Visible(sel) => write!(f, "visible {sel}"),
        }
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Poll each strategy in order, giving each an equal share of `timeout`.
/// Returns the first strategy that was satisfied.
pub async fn wait_for(
    ctx: &dyn RenderContext,
    strategies: &[WaitStrategy],
    timeout: Duration,
) -> Result<WaitStrategy> {
    if strategies.is_empty() {
        bail!("no wait strategies given");
    }
    let share = timeout / strategies.len() as u32;
    for strategy in strategies {
        let deadline = Instant::now() + share;
        let probe = strategy.probe_script();
        loop {
            match ctx.execute_js(&probe).await {
                Ok(v) if v.as_bool() == Some(true) => {
                    tracing::debug!("wait satisfied by {strategy}");
                    return Ok(strategy.clone());
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("wait probe for {strategy} failed: {e}"),
            }
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
    let tried: Vec<String> = strategies.iter().map(ToString::to_string).collect();
    Err(anyhow!("none of [{}] appeared within {}s", tried.join(", "), timeout.as_secs()))
}

/// Sanitize a string for safe injection into a JavaScript string literal.
///
/// Escapes all characters that could break out of a JS string context:
/// backslashes, quotes and backticks, line breaks and tabs, and angle
/// brackets (so a value can never close a script tag). Null bytes are
/// stripped.
pub fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}

/// A factory used when the browser tier is disabled or Chromium is absent.
pub struct NoopRendererFactory;

#[async_trait]
impl RendererFactory for NoopRendererFactory {
    async fn launch(&self, _headless: bool) -> Result<Box<dyn Renderer>> {
        Err(anyhow!("browser not available (HTTP-only mode)"))
    }
}
