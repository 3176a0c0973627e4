//! Category fetches: the public entry points of the library.
//!
//! A [`Harvester`] owns the configuration, the browser pool and the tier
//! set, and exposes one operation per category. Each call is independent;
//! nothing is cached between calls.

pub mod orchestrator;
pub mod tiers;

use crate::category::Category;
use crate::config::RuntimeConfig;
use crate::error::FetchError;
use crate::extraction::{EquityQuote, FinancialResults, NormalizedRecord};
use crate::pool::BrowserPool;
use crate::renderer::chromium::ChromiumFactory;
use crate::renderer::{NoopRendererFactory, RendererFactory};
use orchestrator::{Orchestrator, Tier};
use serde::Serialize;
use std::sync::Arc;
use tiers::{ApiTier, BrowserTier, StaticHtmlTier};
use tracing::Instrument;

/// What a tier produced, in the category's output shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Harvest {
    Records(Vec<NormalizedRecord>),
    Quote(EquityQuote),
    Financials(FinancialResults),
}

impl Harvest {
    pub fn is_empty(&self) -> bool {
        match self {
            Harvest::Records(records) => records.is_empty(),
            Harvest::Quote(quote) => quote.is_empty(),
            Harvest::Financials(results) => results.is_empty(),
        }
    }

    pub fn into_records(self) -> Result<Vec<NormalizedRecord>, FetchError> {
        match self {
            Harvest::Records(records) => Ok(records),
            other => Err(mismatch("records", &other)),
        }
    }

    pub fn into_quote(self) -> Result<EquityQuote, FetchError> {
        match self {
            Harvest::Quote(quote) => Ok(quote),
            other => Err(mismatch("a quote", &other)),
        }
    }

    pub fn into_financials(self) -> Result<FinancialResults, FetchError> {
        match self {
            Harvest::Financials(results) => Ok(results),
            other => Err(mismatch("financial results", &other)),
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            Harvest::Records(_) => "records",
            Harvest::Quote(_) => "a quote",
            Harvest::Financials(_) => "financial results",
        }
    }
}

fn mismatch(wanted: &str, got: &Harvest) -> FetchError {
    FetchError::ParseMiss(format!("expected {wanted}, tier produced {}", got.shape()))
}

/// Trim and upper-case a caller-supplied symbol.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

pub struct Harvester {
    orchestrator: Orchestrator,
    pool: Arc<BrowserPool>,
}

impl Harvester {
    /// The production tier set: API, static HTML and Chromium.
    pub fn new(config: Arc<RuntimeConfig>) -> Self {
        let factory: Arc<dyn RendererFactory> = if config.browser_enabled {
            Arc::new(ChromiumFactory::new(config.chromium_path.clone()))
        } else {
            Arc::new(NoopRendererFactory)
        };
        Self::with_factory(config, factory)
    }

    /// Production HTTP tiers with a custom browser backend.
    pub fn with_factory(config: Arc<RuntimeConfig>, factory: Arc<dyn RendererFactory>) -> Self {
        let pool = Arc::new(BrowserPool::new(config.max_browsers));
        let tiers: Vec<Arc<dyn Tier>> = vec![
            Arc::new(ApiTier),
            Arc::new(StaticHtmlTier),
            Arc::new(BrowserTier::new(Arc::clone(&config), Arc::clone(&pool), factory)),
        ];
        Self {
            orchestrator: Orchestrator::new(config, tiers),
            pool,
        }
    }

    /// An arbitrary tier set.
    pub fn with_tiers(config: Arc<RuntimeConfig>, tiers: Vec<Arc<dyn Tier>>) -> Self {
        let pool = Arc::new(BrowserPool::new(config.max_browsers));
        Self {
            orchestrator: Orchestrator::new(config, tiers),
            pool,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        self.orchestrator.config()
    }

    pub fn pool(&self) -> &BrowserPool {
        &self.pool
    }

    /// Fetch any category. `symbol` is trimmed and upper-cased first.
    pub async fn fetch(&self, category: Category, symbol: &str, headless: bool) -> Result<Harvest, FetchError> {
        let symbol = normalize_symbol(symbol);
        let call_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("fetch", %call_id, %category, symbol = %symbol);
        self.orchestrator
            .run(category.descriptor(), &symbol, headless)
            .instrument(span)
            .await
    }

    pub async fn event_calendar(&self, symbol: &str, headless: bool) -> Result<Vec<NormalizedRecord>, FetchError> {
        self.fetch(Category::EventCalendar, symbol, headless)
            .await?
            .into_records()
    }

    pub async fn board_meetings(&self, symbol: &str, headless: bool) -> Result<Vec<NormalizedRecord>, FetchError> {
        self.fetch(Category::BoardMeetings, symbol, headless)
            .await?
            .into_records()
    }

    pub async fn corporate_actions(
        &self,
        symbol: &str,
        headless: bool,
    ) -> Result<Vec<NormalizedRecord>, FetchError> {
        self.fetch(Category::CorporateActions, symbol, headless)
            .await?
            .into_records()
    }

    pub async fn announcements(&self, symbol: &str, headless: bool) -> Result<Vec<NormalizedRecord>, FetchError> {
        self.fetch(Category::Announcements, symbol, headless)
            .await?
            .into_records()
    }

    pub async fn equity_quote(&self, symbol: &str, headless: bool) -> Result<EquityQuote, FetchError> {
        self.fetch(Category::EquityQuote, symbol, headless)
            .await?
            .into_quote()
    }

    pub async fn financial_results(&self, symbol: &str, headless: bool) -> Result<FinancialResults, FetchError> {
        self.fetch(Category::FinancialResults, symbol, headless)
            .await?
            .into_financials()
    }
}
