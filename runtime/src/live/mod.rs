//! Browser-render tier: one isolated browser per job.
//!
//! [`run_job`] launches an engine, opens one tab, runs the category's flow
//! and always shuts the engine down again, whatever the flow returned.

pub mod act;
pub mod interactive;
pub mod navigate;

use crate::category::{BrowserFlow, CategoryDescriptor};
use crate::config::RuntimeConfig;
use crate::error::FetchError;
use crate::harvest::Harvest;
use crate::renderer::{RenderContext, RendererFactory};
use crate::stealth::Humanizer;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Upper bound for a single page load.
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything a browser job needs, owned so it can move to a worker thread.
#[derive(Clone)]
pub struct BrowserJob {
    pub descriptor: &'static CategoryDescriptor,
    pub symbol: String,
    pub headless: bool,
    pub config: Arc<RuntimeConfig>,
}

impl BrowserJob {
    pub(crate) fn humanizer(&self) -> Humanizer {
        Humanizer::new(self.config.humanize)
    }

    pub(crate) fn navigation_timeout_ms(&self) -> u64 {
        NAVIGATION_TIMEOUT.min(self.config.browser_timeout).as_millis() as u64
    }

    /// A single element wait never takes more than a quarter of the job's
    /// budget, so a short budget still leaves room to extract.
    pub(crate) fn wait_limit(&self, wanted: Duration) -> Duration {
        wanted.min(self.config.browser_timeout / 4)
    }
}

/// Launch a browser, run the job's flow and tear the browser down.
pub async fn run_job(factory: Arc<dyn RendererFactory>, job: BrowserJob) -> Result<Harvest, FetchError> {
    let renderer = factory
        .launch(job.headless)
        .await
        .map_err(FetchError::automation)?;

    let outcome = match renderer.new_context().await {
        Ok(mut ctx) => {
            let outcome = run_flow(ctx.as_mut(), &job).await;
            if let Err(e) = ctx.close().await {
                debug!("closing tab failed: {e:#}");
            }
            outcome
        }
        Err(e) => Err(FetchError::automation(e)),
    };

    if let Err(e) = renderer.shutdown().await {
        debug!("browser shutdown failed: {e:#}");
    }
    outcome
}

async fn run_flow(ctx: &mut dyn RenderContext, job: &BrowserJob) -> Result<Harvest, FetchError> {
    match job.descriptor.flow {
        BrowserFlow::Table => {
            let table = job.descriptor.table.as_ref().ok_or_else(|| {
                FetchError::Automation(format!("{} has no table layout", job.descriptor.category))
            })?;
            navigate::table_flow(ctx, job, table).await.map(Harvest::Records)
        }
        BrowserFlow::Quote => interactive::quote_flow(ctx, job).await.map(Harvest::Quote),
        BrowserFlow::FinancialResults => interactive::financial_results_flow(ctx, job)
            .await
            .map(Harvest::Financials),
    }
}

/// Navigate, mapping failure to an automation error.
pub(crate) async fn open(ctx: &mut dyn RenderContext, url: &str, job: &BrowserJob) -> Result<(), FetchError> {
    debug!("navigating to {url}");
    ctx.navigate(url, job.navigation_timeout_ms())
        .await
        .map(|_| ())
        .map_err(FetchError::automation)
}
