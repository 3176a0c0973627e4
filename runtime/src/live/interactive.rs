//! Browser-only categories: the equity quote page and the financial-results
//! comparison form.

use super::act::{body_text, click_suggestion, first_present, percent_fragments, submit, type_humanly};
use super::{open, BrowserJob};
use crate::error::FetchError;
use crate::extraction::financials::{parse_financial_results, FinancialResults, RESULTS_TABLE_SELECTORS};
use crate::extraction::quote::{parse_quote, EquityQuote};
use crate::renderer::{wait_for, RenderContext, WaitStrategy};
use std::time::Duration;
use tracing::{debug, info};

const FRAGMENT_MAX_LEN: usize = 48;
const QUOTE_WAIT: Duration = Duration::from_secs(20);
const SUGGESTION_WAIT: Duration = Duration::from_secs(15);
const RESULTS_WAIT: Duration = Duration::from_secs(45);

const QUOTE_READY: &[&str] = &["#quoteLtp", "#priceInfoTable", "[id*='quote']"];

const SEARCH_INPUTS: &[&str] = &[
    "input#financialResultsSymbol",
    "input#symbol",
    "input[placeholder*='Company']",
    "input[placeholder*='Symbol']",
    "input.rbt-input-main",
    "input[type='search']",
    "input[type='text']",
];
const SUGGESTION_LISTS: &[&str] = &[
    "ul.rbt-menu",
    "ul[role='listbox']",
    ".autocomplete-results",
    "ul.ui-autocomplete",
];
const SUGGESTION_ITEMS: &str =
    "ul.rbt-menu li, [role='option'], .autocomplete-results li, ul.ui-autocomplete li";
const SUBMIT_CONTROLS: &[&str] = &[
    "button#getFinancialResults",
    "button[type='submit']",
    "input[type='submit']",
    "button.btn-search",
];

/// Open the quote page and read it with the label-anchored parser.
pub async fn quote_flow(ctx: &mut dyn RenderContext, job: &BrowserJob) -> Result<EquityQuote, FetchError> {
    let human = job.humanizer();

    open(ctx, &job.descriptor.page_url(&job.config, &job.symbol), job).await?;
    human.pause(2000, 4000).await;
    human.wander(&*ctx).await;

    let ready: Vec<WaitStrategy> = QUOTE_READY
        .iter()
        .map(|s| WaitStrategy::Visible(s.to_string()))
        .collect();
    if let Err(e) = wait_for(&*ctx, &ready, job.wait_limit(QUOTE_WAIT)).await {
        debug!("quote widgets not detected: {e:#}");
    }
    human.pause(1000, 2000).await;

    let text = body_text(&*ctx).await.map_err(FetchError::automation)?;
    let fragments = percent_fragments(&*ctx, FRAGMENT_MAX_LEN)
        .await
        .map_err(FetchError::automation)?;
    let quote = parse_quote(&job.symbol, &text, &fragments);

    info!(
        "quote for {}: last price {:?}, {} return periods",
        job.symbol,
        quote.last_price,
        quote.returns.len()
    );
    Ok(quote)
}

/// Search for the company on the comparison page and parse the results
/// table once it is visible.
pub async fn financial_results_flow(
    ctx: &mut dyn RenderContext,
    job: &BrowserJob,
) -> Result<FinancialResults, FetchError> {
    let human = job.humanizer();

    open(ctx, &job.config.url("/"), job).await?;
    human.pause(1000, 2000).await;
    open(ctx, &job.config.url(job.descriptor.page_path), job).await?;
    human.wander(&*ctx).await;

    let ctx: &dyn RenderContext = &*ctx;
    let input = first_present(ctx, SEARCH_INPUTS)
        .await
        .ok_or_else(|| FetchError::ParseMiss("company search input not found".into()))?;
    debug!("search input: {input}");

    if let Err(e) = ctx.click(input).await {
        debug!("focusing search input by click failed: {e:#}");
    }
    type_humanly(ctx, input, &job.symbol, &human)
        .await
        .map_err(FetchError::automation)?;

    let lists: Vec<WaitStrategy> = SUGGESTION_LISTS
        .iter()
        .map(|s| WaitStrategy::Visible(s.to_string()))
        .collect();
    let picked = match wait_for(ctx, &lists, job.wait_limit(SUGGESTION_WAIT)).await {
        Ok(_) => {
            human.pause(300, 800).await;
            click_suggestion(ctx, SUGGESTION_ITEMS, &job.symbol)
                .await
                .map_err(FetchError::automation)?
        }
        Err(e) => {
            debug!("no autocomplete list: {e:#}");
            false
        }
    };
    if !picked {
        debug!("no suggestion matched {}, confirming with Enter", job.symbol);
        ctx.press_key(input, "Enter")
            .await
            .map_err(FetchError::automation)?;
    }

    human.pause(500, 1200).await;
    submit(ctx, input, SUBMIT_CONTROLS)
        .await
        .map_err(FetchError::automation)?;

    let results: Vec<WaitStrategy> = RESULTS_TABLE_SELECTORS
        .iter()
        .map(|s| WaitStrategy::Visible(s.to_string()))
        .collect();
    wait_for(ctx, &results, job.wait_limit(RESULTS_WAIT))
        .await
        .map_err(|e| FetchError::ParseMiss(format!("financial results table never appeared: {e:#}")))?;
    human.pause(1000, 2000).await;

    let html = ctx.get_html().await.map_err(FetchError::automation)?;
    let results = parse_financial_results(&html, &job.symbol)
        .ok_or_else(|| FetchError::ParseMiss("financial results table vanished before extraction".into()))?;

    info!(
        "financial results for {}: {} periods, {} sections",
        job.symbol,
        results.quarters.len(),
        results.sections.len()
    );
    Ok(results)
}
