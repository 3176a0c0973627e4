//! Environment readiness check.

use super::output::check_line;
use crate::category::Category;
use crate::config::RuntimeConfig;
use crate::renderer::chromium::find_chromium;
use anyhow::{Context, Result};

/// Print the effective configuration and whether a browser can be launched.
pub async fn run() -> Result<()> {
    let config = RuntimeConfig::from_env().context("loading configuration")?;

    println!("filingscope doctor");
    println!("==================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    println!("Source:          {}", config.base_url);
    println!("HTTP timeout:    {}s", config.http_timeout.as_secs());
    println!("Tier timeout:    {}s", config.tier_timeout.as_secs());
    println!("Browser timeout: {}s", config.browser_timeout.as_secs());
    println!("Block retries:   {}", config.block_retries);
    println!("Humanize:        {}", config.humanize);
    println!();

    let chromium = find_chromium(config.chromium_path.as_deref());
    if config.browser_enabled {
        match &chromium {
            Some(path) => println!("{}", check_line(true, &format!("Chromium found: {}", path.display()))),
            None => println!(
                "{}",
                check_line(
                    false,
                    "Chromium NOT found. Install Chrome/Chromium or set FILINGSCOPE_CHROMIUM_PATH."
                )
            ),
        }
        println!("     up to {} concurrent browsers", config.max_browsers);
    } else {
        println!("[--] Browser tier disabled (FILINGSCOPE_BROWSER_ENABLED)");
    }

    let browser_only: Vec<String> = Category::ALL
        .iter()
        .filter(|c| !c.is_tabular())
        .map(|c| c.to_string())
        .collect();

    println!();
    if !config.browser_enabled {
        println!("Status: PARTIAL");
        println!("  {} require the browser tier.", browser_only.join(", "));
    } else if chromium.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
        println!("  {} will fail without a browser.", browser_only.join(", "));
    }

    Ok(())
}
