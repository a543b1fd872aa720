// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine() -> ReqwestEngine {
    ReqwestEngine::new(
        Duration::from_secs(5),
        3,
        RedirectStubRule {
            min_bytes: 100,
            markers: vec!["setTimeout".to_string()],
        },
    )
    .unwrap()
}

fn long_page(body: &str) -> String {
    format!(
        "<html><body>{}<p>{}</p></body></html>",
        body,
        "填充内容".repeat(40)
    )
}

#[tokio::test]
async fn test_scrape_returns_decoded_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(header("referer", "http://origin.example/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(long_page("今日要闻")),
        )
        .mount(&server)
        .await;

    let request = ScrapeRequest::new(format!("{}/list", server.uri()), Duration::from_secs(5))
        .with_referer("http://origin.example/");
    let response = engine().scrape(&request).await.unwrap();

    assert_eq!(response.status_code, 200);
    assert!(response.content.contains("今日要闻"));
    assert!(response.content_type.starts_with("text/html"));
    assert!(response.final_url.ends_with("/list"));
}

#[tokio::test]
async fn test_scrape_rejects_redirect_stub() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stub"))
        .respond_with(ResponseTemplate::new(200).set_body_string(long_page(
            "<script>setTimeout(function(){location.href='/real'}, 0)</script>",
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tiny"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let stub = ScrapeRequest::new(format!("{}/stub", server.uri()), Duration::from_secs(5));
    assert!(matches!(
        engine().scrape(&stub).await,
        Err(EngineError::RedirectStub)
    ));

    let tiny = ScrapeRequest::new(format!("{}/tiny", server.uri()), Duration::from_secs(5));
    assert!(matches!(
        engine().scrape(&tiny).await,
        Err(EngineError::RedirectStub)
    ));
}

#[tokio::test]
async fn test_scrape_reports_bad_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let request = ScrapeRequest::new(format!("{}/error", server.uri()), Duration::from_secs(5));
    assert!(matches!(
        engine().scrape(&request).await,
        Err(EngineError::HttpStatus(500))
    ));
}

#[tokio::test]
async fn test_scrape_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(long_page("slow"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let request = ScrapeRequest::new(format!("{}/slow", server.uri()), Duration::from_millis(200));
    assert!(matches!(
        engine().scrape(&request).await,
        Err(EngineError::Timeout)
    ));
}
