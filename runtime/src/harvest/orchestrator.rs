//! Tier sequencing for one category fetch.
//!
//! Tiers run cheapest first. The first non-empty result wins. Errors and
//! empty results on a non-final tier fall through; on the final applicable
//! tier an error is surfaced and an empty result is returned as success.

use super::Harvest;
use crate::acquisition::http_client::LazySession;
use crate::category::{CategoryDescriptor, FetchTier};
use crate::config::RuntimeConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Extra time granted on top of the browser budget so the pool's own
/// timeout (which tears the worker down) fires first.
const BROWSER_GRACE: Duration = Duration::from_secs(5);

/// Inputs shared by every tier of one call.
pub struct TierRequest<'a> {
    pub descriptor: &'static CategoryDescriptor,
    pub symbol: &'a str,
    pub headless: bool,
    /// Primed on first use by whichever HTTP tier runs first.
    pub session: &'a LazySession,
}

/// One fetch strategy.
#[async_trait]
pub trait Tier: Send + Sync {
    fn kind(&self) -> FetchTier;
    async fn fetch(&self, request: &TierRequest<'_>) -> Result<Harvest, FetchError>;
}

pub struct Orchestrator {
    config: Arc<RuntimeConfig>,
    tiers: Vec<Arc<dyn Tier>>,
}

impl Orchestrator {
    pub fn new(config: Arc<RuntimeConfig>, tiers: Vec<Arc<dyn Tier>>) -> Self {
        Self { config, tiers }
    }

    pub fn config(&self) -> &Arc<RuntimeConfig> {
        &self.config
    }

    /// Tiers that will run for `descriptor`, in order.
    pub fn applicable(&self, descriptor: &CategoryDescriptor) -> Vec<Arc<dyn Tier>> {
        descriptor
            .tiers
            .iter()
            .filter(|kind| self.config.browser_enabled || **kind != FetchTier::BrowserRender)
            .filter_map(|kind| self.tiers.iter().find(|t| t.kind() == *kind).cloned())
            .collect()
    }

    fn budget(&self, kind: FetchTier) -> Duration {
        match kind {
            FetchTier::BrowserRender => self.config.browser_timeout.saturating_add(BROWSER_GRACE),
            FetchTier::ApiProbe | FetchTier::StaticHtml => self.config.tier_timeout,
        }
    }

    pub async fn run(
        &self,
        descriptor: &'static CategoryDescriptor,
        symbol: &str,
        headless: bool,
    ) -> Result<Harvest, FetchError> {
        let tiers = self.applicable(descriptor);
        if tiers.is_empty() {
            return Err(FetchError::Automation(format!(
                "{} is only available through the browser tier, which is disabled",
                descriptor.category
            )));
        }

        let session = LazySession::new(Arc::clone(&self.config));
        let request = TierRequest {
            descriptor,
            symbol,
            headless,
            session: &session,
        };

        let mut last = None;
        for tier in &tiers {
            let kind = tier.kind();
            let budget = self.budget(kind);
            let outcome = match tokio::time::timeout(budget, tier.fetch(&request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::Timeout(budget)),
            };

            if matches!(&outcome, Ok(harvest) if !harvest.is_empty()) {
                info!("{} for {symbol}: {kind} tier succeeded", descriptor.category);
                return outcome;
            }
            match &outcome {
                Ok(_) => debug!("{} for {symbol}: {kind} tier returned nothing", descriptor.category),
                Err(e) => warn!("{} for {symbol}: {kind} tier failed: {e}", descriptor.category),
            }
            last = Some(outcome);
        }

        // The final tier's outcome stands: an error surfaces, empty is "no data".
        last.unwrap_or_else(|| Err(FetchError::Automation("no tier ran".into())))
    }
}
