// Copyright 2026 Filingscope Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use filingscope_runtime::cli;

#[derive(Parser)]
#[command(
    name = "filingscope",
    about = "filingscope: NSE corporate filings, quotes and results through API, static HTML or a headless browser",
    version,
    after_help = "Run 'filingscope <command> --help' for details on each command.\nCategories: event-calendar, board-meetings, corporate-actions, announcements, equity-quote, financial-results."
)]
struct Cli {
    /// Print errors as a JSON object
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Interface to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, default_value = "8000")]
        port: u16,
    },
    /// Fetch one category for one symbol and print the result
    Fetch {
        /// Category (e.g. "board-meetings", "equity-quote")
        category: String,
        /// Trading symbol (e.g. "RELIANCE")
        symbol: String,
        /// Show the browser window if the browser tier runs
        #[arg(long)]
        headful: bool,
    },
    /// Check configuration and browser availability
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose, cli.log_json);

    let result = match cli.command {
        Commands::Serve { host, port } => cli::serve::run(&host, port).await,
        Commands::Fetch {
            category,
            symbol,
            headful,
        } => cli::fetch_cmd::run(&category, &symbol, headful).await,
        Commands::Doctor => cli::doctor::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "filingscope", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        cli::output::print_error(e, cli.json);
        std::process::exit(1);
    }

    result
}
