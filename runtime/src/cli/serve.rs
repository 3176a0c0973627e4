//! `filingscope serve`: run the HTTP shell in the foreground.

use crate::config::RuntimeConfig;
use crate::harvest::Harvester;
use crate::rest::{self, AppState};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub async fn run(host: &str, port: u16) -> Result<()> {
    let config = Arc::new(RuntimeConfig::from_env().context("loading configuration")?);
    info!(
        "source {} | browser tier {} | up to {} browsers",
        config.base_url,
        if config.browser_enabled { "enabled" } else { "disabled" },
        config.max_browsers
    );

    let state = Arc::new(AppState {
        harvester: Harvester::new(config),
    });

    tokio::select! {
        served = rest::start(host, port, state) => served.with_context(|| format!("serving on {host}:{port}")),
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            Ok(())
        }
    }
}
