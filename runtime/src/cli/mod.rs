//! CLI subcommand implementations for the filingscope binary.

pub mod doctor;
pub mod fetch_cmd;
pub mod output;
pub mod serve;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the crate logs at `info`, or `debug`
/// with `--verbose`. Logs go to stderr so `fetch` output stays pipeable.
pub fn init_logging(verbose: bool, json: bool) {
    let default = if verbose {
        "filingscope=debug,filingscope_runtime=debug"
    } else {
        "filingscope=info,filingscope_runtime=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose);
    // A second init (tests, embedding) is not an error worth surfacing.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
