//! Shared fixtures for the integration tests: a scripted browser backend,
//! instrumented tiers and a config pointed at a mock source.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use filingscope_runtime::category::FetchTier;
use filingscope_runtime::config::RuntimeConfig;
use filingscope_runtime::error::FetchError;
use filingscope_runtime::extraction::NormalizedRecord;
use filingscope_runtime::harvest::orchestrator::{Tier, TierRequest};
use filingscope_runtime::harvest::Harvest;
use filingscope_runtime::renderer::{NavigationResult, RenderContext, Renderer, RendererFactory};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fast, non-humanized config for `base_url`.
pub fn test_config(base_url: &str) -> RuntimeConfig {
    RuntimeConfig {
        base_url: base_url.trim_end_matches('/').to_string(),
        http_timeout: Duration::from_secs(5),
        tier_timeout: Duration::from_secs(10),
        browser_timeout: Duration::from_secs(20),
        prime_delay: Duration::from_millis(10),
        humanize: false,
        ..RuntimeConfig::default()
    }
}

pub fn record(pairs: &[(&'static str, &str)]) -> NormalizedRecord {
    let mut record = NormalizedRecord::new();
    for &(name, value) in pairs {
        record.set(name, value);
    }
    record
}

// ── Scripted browser ────────────────────────────────────────────

/// What the scripted page answers, plus counters for assertions.
#[derive(Default)]
pub struct Script {
    pub html: String,
    pub body_text: String,
    pub fragments: Vec<String>,
    pub launches: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub visited: Mutex<Vec<String>>,
    pub typed: Mutex<String>,
    pub fail_launch: bool,
    /// Rows appear only after the page is scrolled to the bottom.
    pub lazy_rows: bool,
    pub scrolled: AtomicBool,
    pub html_reads: AtomicUsize,
}

impl Script {
    pub fn with_html(html: &str) -> Arc<Self> {
        Arc::new(Self {
            html: html.to_string(),
            ..Self::default()
        })
    }

    pub fn lazy(html: &str) -> Arc<Self> {
        Arc::new(Self {
            html: html.to_string(),
            lazy_rows: true,
            ..Self::default()
        })
    }

    pub fn html_reads(&self) -> usize {
        self.html_reads.load(Ordering::SeqCst)
    }

    fn rows_loaded(&self) -> bool {
        !self.lazy_rows || self.scrolled.load(Ordering::SeqCst)
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

pub struct ScriptedFactory(pub Arc<Script>);

#[async_trait]
impl RendererFactory for ScriptedFactory {
    async fn launch(&self, _headless: bool) -> Result<Box<dyn Renderer>> {
        self.0.launches.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_launch {
            bail!("no browser binary");
        }
        Ok(Box::new(ScriptedRenderer(Arc::clone(&self.0))))
    }
}

struct ScriptedRenderer(Arc<Script>);

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Ok(Box::new(ScriptedContext {
            script: Arc::clone(&self.0),
            url: String::new(),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.0.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedContext {
    script: Arc<Script>,
    url: String,
}

#[async_trait]
impl RenderContext for ScriptedContext {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        self.url = url.to_string();
        self.script.visited.lock().unwrap().push(url.to_string());
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 1,
        })
    }

    async fn execute_js(&self, script: &str) -> Result<Value> {
        if script.contains("document.body.innerText") {
            return Ok(json!(self.script.body_text));
        }
        if script.contains("querySelectorAll('li, td, th, div, span, p')") {
            return Ok(json!(self.script.fragments));
        }
        if script.contains("document.body.scrollHeight") {
            self.script.scrolled.store(true, Ordering::SeqCst);
            return Ok(json!(true));
        }
        // Selector checks, suggestion clicks and pointer events all succeed
        // once rows are loaded.
        Ok(json!(self.script.rows_loaded()))
    }

    async fn get_html(&self) -> Result<String> {
        self.script.html_reads.fetch_add(1, Ordering::SeqCst);
        if self.script.rows_loaded() {
            Ok(self.script.html.clone())
        } else {
            Ok("<html><body><div id=\"loading\"></div></body></html>".to_string())
        }
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn type_text(&self, _selector: &str, text: &str) -> Result<()> {
        self.script.typed.lock().unwrap().push_str(text);
        Ok(())
    }

    async fn click(&self, _selector: &str) -> Result<()> {
        Ok(())
    }

    async fn press_key(&self, _selector: &str, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

// ── Instrumented tiers ──────────────────────────────────────────

/// What a [`CountingTier`] does when called.
#[derive(Clone)]
pub enum Behavior {
    Yield(Harvest),
    Fail(FetchError),
    Sleep(Duration),
}

pub struct CountingTier {
    kind: FetchTier,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl CountingTier {
    pub fn new(kind: FetchTier, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tier for CountingTier {
    fn kind(&self) -> FetchTier {
        self.kind
    }

    async fn fetch(&self, _request: &TierRequest<'_>) -> Result<Harvest, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Yield(harvest) => Ok(harvest.clone()),
            Behavior::Fail(err) => Err(err.clone()),
            Behavior::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(Harvest::Records(Vec::new()))
            }
        }
    }
}

pub fn as_tiers(tiers: &[&Arc<CountingTier>]) -> Vec<Arc<dyn Tier>> {
    tiers
        .iter()
        .map(|t| Arc::clone(*t) as Arc<dyn Tier>)
        .collect()
}
