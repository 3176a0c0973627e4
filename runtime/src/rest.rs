// Copyright 2026 Filingscope Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP shell over the harvester.
//!
//! One GET endpoint per category, `?symbol=` required and `headless`
//! optional. Listing categories answer `{symbol, count, rows}`, the
//! quote and financial results answer `{symbol, data}`. Failures answer
//! `{symbol, error, message}` with the error kind tag.

use crate::category::Category;
use crate::error::{ErrorKind, FetchError, FetchFailure};
use crate::harvest::{normalize_symbol, Harvest, Harvester};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::{Json, Router};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

static SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9&_.\-]{1,20}$").expect("symbol regex is valid"));

/// Shared state behind every handler.
pub struct AppState {
    pub harvester: Harvester,
}

#[derive(Debug, Default, Deserialize)]
pub struct FetchQuery {
    pub symbol: Option<String>,
    pub headless: Option<String>,
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new().route("/health", get(health));
    for category in Category::ALL {
        router = router.route(&format!("/{}", category.slug()), category_route(category));
    }
    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until the process is stopped.
pub async fn start(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("REST API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn category_route(category: Category) -> MethodRouter<Arc<AppState>> {
    get(
        move |State(state): State<Arc<AppState>>, Query(query): Query<FetchQuery>| async move {
            fetch_category(&state, category, query).await
        },
    )
}

async fn fetch_category(state: &AppState, category: Category, query: FetchQuery) -> Result<Json<Value>, ApiError> {
    let symbol = validate_symbol(query.symbol.as_deref())?;
    let headless = parse_headless(query.headless.as_deref())?;

    let harvest = state
        .harvester
        .fetch(category, &symbol, headless)
        .await
        .map_err(|e| ApiError::from((symbol.as_str(), e)))?;
    Ok(Json(envelope(&symbol, harvest)))
}

/// Upper-case and check a symbol from the query string.
pub fn validate_symbol(raw: Option<&str>) -> Result<String, ApiError> {
    let symbol = normalize_symbol(raw.unwrap_or_default());
    if symbol.is_empty() {
        return Err(ApiError::BadRequest("query parameter 'symbol' is required".into()));
    }
    if !SYMBOL.is_match(&symbol) {
        return Err(ApiError::BadRequest(format!(
            "invalid symbol {symbol:?}: expected 1-20 characters of A-Z, 0-9, &, -, _ or ."
        )));
    }
    Ok(symbol)
}

fn parse_headless(raw: Option<&str>) -> Result<bool, ApiError> {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(true),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ApiError::BadRequest(format!(
            "invalid headless flag {other:?}: expected true or false"
        ))),
    }
}

/// Wrap a harvest in the response envelope.
pub fn envelope(symbol: &str, harvest: Harvest) -> Value {
    match harvest {
        Harvest::Records(rows) => json!({
            "symbol": symbol,
            "count": rows.len(),
            "rows": rows,
        }),
        Harvest::Quote(quote) => json!({ "symbol": symbol, "data": quote }),
        Harvest::Financials(results) => json!({ "symbol": symbol, "data": results }),
    }
}

// ── Errors ──────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Fetch(FetchFailure),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "bad_request", "message": message })),
            )
                .into_response(),
            ApiError::Fetch(failure) => {
                let status = match failure.error {
                    ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, Json(failure)).into_response()
            }
        }
    }
}

impl From<(&str, FetchError)> for ApiError {
    fn from((symbol, err): (&str, FetchError)) -> Self {
        ApiError::Fetch(FetchFailure::new(symbol, &err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::NormalizedRecord;

    #[test]
    fn test_symbol_validation() {
        assert_eq!(validate_symbol(Some(" m&m ")).unwrap(), "M&M");
        assert_eq!(validate_symbol(Some("bajaj-auto")).unwrap(), "BAJAJ-AUTO");
        assert!(matches!(validate_symbol(None), Err(ApiError::BadRequest(_))));
        assert!(matches!(validate_symbol(Some("   ")), Err(ApiError::BadRequest(_))));
        assert!(validate_symbol(Some("TCS;DROP")).is_err());
        assert!(validate_symbol(Some("A".repeat(21).as_str())).is_err());
    }

    #[test]
    fn test_headless_flag() {
        assert!(parse_headless(None).unwrap());
        assert!(!parse_headless(Some("false")).unwrap());
        assert!(parse_headless(Some("1")).unwrap());
        assert!(parse_headless(Some("sometimes")).is_err());
    }

    #[test]
    fn test_record_envelope() {
        let mut record = NormalizedRecord::new();
        record.set("symbol", "TCS");
        let value = envelope("TCS", Harvest::Records(vec![record]));
        assert_eq!(
            value,
            json!({ "symbol": "TCS", "count": 1, "rows": [{ "symbol": "TCS" }] })
        );
    }

    #[test]
    fn test_timeout_maps_to_gateway_timeout() {
        let err = ApiError::from(("TCS", FetchError::Timeout(std::time::Duration::from_secs(1))));
        assert_eq!(err.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
        let err = ApiError::from(("TCS", FetchError::Blocked { status: 403 }));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
