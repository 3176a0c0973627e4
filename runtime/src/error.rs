//! Error taxonomy for category fetches.
//!
//! Tiers report a [`FetchError`]; the orchestrator decides whether it is
//! recovered locally (non-final tier) or surfaced. At the service boundary a
//! surfaced error becomes a [`FetchFailure`], which carries only the symbol,
//! a stable kind tag and a human-readable message.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why a fetch attempt failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Network failure, connection reset, request timeout or bad status.
    #[error("transport error: {0}")]
    Transport(String),
    /// The source rejected the request as automated traffic.
    #[error("request blocked by source (HTTP {status})")]
    Blocked { status: u16 },
    /// The expected table, element or payload shape was not present.
    #[error("expected content not found: {0}")]
    ParseMiss(String),
    /// The browser could not be launched or an interaction step failed.
    #[error("browser automation failed: {0}")]
    Automation(String),
    /// The wall-clock budget for the attempt ran out.
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Stable tag for each error variant, used in the boundary envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TransportError,
    Blocked,
    ParseMiss,
    AutomationFailure,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransportError => "transport_error",
            ErrorKind::Blocked => "blocked",
            ErrorKind::ParseMiss => "parse_miss",
            ErrorKind::AutomationFailure => "automation_failure",
            ErrorKind::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Transport(_) => ErrorKind::TransportError,
            FetchError::Blocked { .. } => ErrorKind::Blocked,
            FetchError::ParseMiss(_) => ErrorKind::ParseMiss,
            FetchError::Automation(_) => ErrorKind::AutomationFailure,
            FetchError::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Wrap a renderer-level error as an automation failure, keeping the
    /// context chain in the message.
    pub fn automation(err: anyhow::Error) -> Self {
        FetchError::Automation(format!("{err:#}"))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        // Drop the URL: it carries query strings that add nothing for callers.
        FetchError::Transport(e.without_url().to_string())
    }
}

/// A surfaced category failure as seen by callers of the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub symbol: String,
    pub error: ErrorKind,
    pub message: String,
}

impl FetchFailure {
    pub fn new(symbol: &str, err: &FetchError) -> Self {
        Self {
            symbol: symbol.to_string(),
            error: err.kind(),
            message: err.to_string(),
        }
    }
}
