//! Listing categories in a real browser: open the page, wait for the table,
//! extract.

use super::{open, BrowserJob};
use crate::error::FetchError;
use crate::extraction::normalize::NormalizedRecord;
use crate::extraction::table::{extract_table, TableSpec};
use crate::renderer::{wait_for, RenderContext, WaitStrategy};
use std::time::Duration;
use tracing::{debug, info};

const TABLE_WAIT: Duration = Duration::from_secs(30);
const ROWS_WAIT: Duration = Duration::from_secs(10);

/// Strategies that detect the table element itself.
pub fn table_wait_strategies(table: &TableSpec) -> Vec<WaitStrategy> {
    vec![
        WaitStrategy::ElementId(table.anchor_id.to_string()),
        WaitStrategy::Selector(format!("table[id*='{}']", table.id_fragment)),
    ]
}

/// Strategy that detects at least one populated row.
pub fn row_wait_strategy(table: &TableSpec) -> WaitStrategy {
    WaitStrategy::MinRows {
        selector: format!("#{} tbody tr", table.anchor_id),
        min: 1,
    }
}

/// Root page, then the category page, then wait and extract. A table that
/// never appears is not an error here: the page may simply have no rows.
pub async fn table_flow(
    ctx: &mut dyn RenderContext,
    job: &BrowserJob,
    table: &TableSpec,
) -> Result<Vec<NormalizedRecord>, FetchError> {
    let human = job.humanizer();

    open(ctx, &job.config.url("/"), job).await?;
    human.pause(800, 1800).await;
    open(ctx, &job.descriptor.page_url(&job.config, &job.symbol), job).await?;
    human.wander(&*ctx).await;

    match wait_for(&*ctx, &table_wait_strategies(table), job.wait_limit(TABLE_WAIT)).await {
        Ok(_) => {
            let rows = [row_wait_strategy(table)];
            if let Err(e) = wait_for(&*ctx, &rows, job.wait_limit(ROWS_WAIT)).await {
                debug!("table present but no rows yet: {e:#}");
            }
        }
        Err(e) => debug!("{} table wait failed: {e:#}", job.descriptor.category),
    }
    // Rows are sometimes filled in after the table first renders.
    human.pause(1500, 2500).await;

    let mut records = extract(&*ctx, table).await?;
    if records.is_empty() {
        debug!("no rows extracted, scrolling to trigger lazy load");
        human.scroll_to_bottom(&*ctx).await;
        human.pause(1500, 2500).await;
        records = extract(&*ctx, table).await?;
    }

    info!(
        "browser extracted {} {} rows for {}",
        records.len(),
        job.descriptor.category,
        job.symbol
    );
    Ok(records)
}

async fn extract(ctx: &dyn RenderContext, table: &TableSpec) -> Result<Vec<NormalizedRecord>, FetchError> {
    let html = ctx.get_html().await.map_err(FetchError::automation)?;
    Ok(extract_table(&html, table))
}
