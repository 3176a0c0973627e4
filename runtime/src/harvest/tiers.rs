//! The three concrete tiers.

use super::orchestrator::{Tier, TierRequest};
use super::Harvest;
use crate::acquisition::api_probe::records_from_payload;
use crate::category::FetchTier;
use crate::config::RuntimeConfig;
use crate::error::FetchError;
use crate::extraction::table::extract_table;
use crate::live::{run_job, BrowserJob};
use crate::pool::BrowserPool;
use crate::renderer::RendererFactory;
use async_trait::async_trait;
use std::sync::Arc;

/// Tier 1: the category's JSON endpoint.
pub struct ApiTier;

#[async_trait]
impl Tier for ApiTier {
    fn kind(&self) -> FetchTier {
        FetchTier::ApiProbe
    }

    async fn fetch(&self, request: &TierRequest<'_>) -> Result<Harvest, FetchError> {
        let d = request.descriptor;
        let (Some(api), Some(mapping)) = (d.api, d.mapping) else {
            return Err(FetchError::ParseMiss(format!("{} has no API endpoint", d.category)));
        };
        let session = request.session.get().await?;
        let referer = d.page_url(session.config(), request.symbol);
        let payload = session
            .get_json(api.path, &d.api_params(request.symbol), &referer)
            .await?;
        Ok(Harvest::Records(records_from_payload(
            &payload,
            &mapping,
            request.symbol,
        )))
    }
}

/// Tier 2: the category page as served, run through the table extractor.
pub struct StaticHtmlTier;

#[async_trait]
impl Tier for StaticHtmlTier {
    fn kind(&self) -> FetchTier {
        FetchTier::StaticHtml
    }

    async fn fetch(&self, request: &TierRequest<'_>) -> Result<Harvest, FetchError> {
        let d = request.descriptor;
        let Some(table) = d.table else {
            return Err(FetchError::ParseMiss(format!("{} has no table layout", d.category)));
        };
        let session = request.session.get().await?;
        let html = session
            .get_html(d.page_path, &[("symbol", request.symbol.to_string())])
            .await?;

        // scraper's DOM is !Send; parse off the async executor.
        let records = tokio::task::spawn_blocking(move || extract_table(&html, &table))
            .await
            .map_err(|e| FetchError::ParseMiss(format!("table extraction panicked: {e}")))?;
        Ok(Harvest::Records(records))
    }
}

/// Tier 3: a real browser on an isolated pool worker.
pub struct BrowserTier {
    config: Arc<RuntimeConfig>,
    pool: Arc<BrowserPool>,
    factory: Arc<dyn RendererFactory>,
}

impl BrowserTier {
    pub fn new(config: Arc<RuntimeConfig>, pool: Arc<BrowserPool>, factory: Arc<dyn RendererFactory>) -> Self {
        Self {
            config,
            pool,
            factory,
        }
    }
}

#[async_trait]
impl Tier for BrowserTier {
    fn kind(&self) -> FetchTier {
        FetchTier::BrowserRender
    }

    async fn fetch(&self, request: &TierRequest<'_>) -> Result<Harvest, FetchError> {
        let job = BrowserJob {
            descriptor: request.descriptor,
            symbol: request.symbol.to_string(),
            headless: request.headless,
            config: Arc::clone(&self.config),
        };
        let factory = Arc::clone(&self.factory);
        self.pool
            .run(self.config.browser_timeout, move || run_job(factory, job))
            .await
    }
}
