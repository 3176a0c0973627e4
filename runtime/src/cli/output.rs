//! Terminal output helpers shared by the subcommands.

use crate::error::FetchError;
use serde::Serialize;
use serde_json::json;

/// Pretty-print any serializable value to stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report a fatal error on one line: plain text, or a JSON object with `--json`.
pub fn print_error(err: &anyhow::Error, as_json: bool) {
    if as_json {
        let kind = match err.downcast_ref::<FetchError>() {
            Some(e) => json!(e.kind()),
            None => json!("cli_error"),
        };
        let body = json!({ "error": kind, "message": format!("{err:#}") });
        println!("{body}");
    } else {
        eprintln!("error: {err:#}");
    }
}

/// `[OK]` / `[!!]` status line used by `doctor`.
pub fn check_line(ok: bool, message: &str) -> String {
    format!("{} {message}", if ok { "[OK]" } else { "[!!]" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_line() {
        assert_eq!(check_line(true, "ready"), "[OK] ready");
        assert_eq!(check_line(false, "missing"), "[!!] missing");
    }
}
