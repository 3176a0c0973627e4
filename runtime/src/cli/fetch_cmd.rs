//! `filingscope fetch <category> <symbol>`: one fetch, envelope to stdout.

use super::output::print_json;
use crate::category::Category;
use crate::config::RuntimeConfig;
use crate::harvest::{normalize_symbol, Harvester};
use crate::rest::envelope;
use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;

pub async fn run(category: &str, symbol: &str, headful: bool) -> Result<()> {
    let category: Category = category.parse().map_err(|e: String| anyhow!(e))?;
    let symbol = normalize_symbol(symbol);
    if symbol.is_empty() {
        bail!("symbol must not be empty");
    }

    let config = Arc::new(RuntimeConfig::from_env().context("loading configuration")?);
    let harvester = Harvester::new(config);

    let harvest = harvester
        .fetch(category, &symbol, !headful)
        .await
        .with_context(|| format!("{category} for {symbol}"))?;
    print_json(&envelope(&symbol, harvest))
}
