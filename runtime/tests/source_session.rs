//! The primed HTTP session against a mock source: priming, block detection
//! and the single re-prime budget.

mod common;

use common::test_config;
use filingscope_runtime::acquisition::http_client::{LazySession, Session};
use filingscope_runtime::error::FetchError;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = "/companies-listing/corporate-filings-actions";

async fn source_with_priming(root_hits: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "nsit=abc123; Path=/")
                .set_body_string("<html>home</html>"),
        )
        .expect(root_hits)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/market-data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>market</html>"))
        .expect(1)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_priming_visits_root_then_market_data() {
    let server = source_with_priming(1).await;
    Mock::given(method("GET"))
        .and(path(PAGE))
        .and(header("referer", format!("{}/", server.uri()).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<table></table>"))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::prime(Arc::new(test_config(&server.uri()))).await.unwrap();
    let html = session.get_html(PAGE, &[("symbol", "TCS".into())]).await.unwrap();
    assert_eq!(html, "<table></table>");
    assert_eq!(session.refresh_count(), 0);
}

#[tokio::test]
async fn test_forbidden_page_is_reprimed_exactly_once() {
    // Root is hit by priming and once more by the re-prime.
    let server = source_with_priming(2).await;
    Mock::given(method("GET"))
        .and(path(PAGE))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PAGE))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::prime(Arc::new(test_config(&server.uri()))).await.unwrap();
    let html = session.get_html(PAGE, &[]).await.unwrap();
    assert_eq!(html, "<p>ok</p>");
    assert_eq!(session.refresh_count(), 1);
}

#[tokio::test]
async fn test_persistent_block_gives_up_after_budget() {
    let server = source_with_priming(2).await;
    Mock::given(method("GET"))
        .and(path(PAGE))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let session = Session::prime(Arc::new(test_config(&server.uri()))).await.unwrap();
    let err = session.get_html(PAGE, &[]).await.unwrap_err();
    assert!(matches!(err, FetchError::Blocked { status: 403 }));
    assert_eq!(session.refresh_count(), 1);
}

#[tokio::test]
async fn test_blocked_api_call_does_not_reprime() {
    let server = source_with_priming(1).await;
    Mock::given(method("GET"))
        .and(path("/api/corporate-actions"))
        .and(query_param("symbol", "TCS"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::prime(Arc::new(test_config(&server.uri()))).await.unwrap();
    let err = session
        .get_json("/api/corporate-actions", &[("symbol", "TCS".into())], &server.uri())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Blocked { status: 401 }));
    assert_eq!(session.refresh_count(), 0);
}

#[tokio::test]
async fn test_server_error_is_transport_and_html_is_not_json() {
    let server = source_with_priming(1).await;
    Mock::given(method("GET"))
        .and(path("/api/corporate-filing"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PAGE))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let session = Session::prime(Arc::new(test_config(&server.uri()))).await.unwrap();
    let err = session
        .get_json("/api/corporate-filing", &[], &server.uri())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::ParseMiss(_)));

    let err = session.get_html(PAGE, &[]).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn test_lazy_session_primes_once() {
    let server = source_with_priming(1).await;
    let lazy = LazySession::new(Arc::new(test_config(&server.uri())));
    assert!(lazy.primed().is_none());

    let first = lazy.get().await.unwrap();
    let second = lazy.get().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(lazy.primed().is_some());
}
