// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_app;
use axum::http::StatusCode;
use newsrs::domain::models::crawl_state::DailyCrawlStatus;
use serde_json::Value;

#[tokio::test]
async fn test_daily_request_starts_then_reports_in_progress_then_serves_cache() {
    let app = create_test_app(3);

    let first = app.server.get("/api/crawler/daily/").await;
    first.assert_status(StatusCode::ACCEPTED);
    let body: Value = first.json();
    assert_eq!(body["status"], "crawling");
    assert_eq!(body["msg"], "crawling_started");
    assert!(body["task_id"].as_str().unwrap().starts_with("task_"));

    // 文章仍被阻塞，第二次请求只能看到进行中
    let second = app.server.get("/api/crawler/daily/").await;
    second.assert_status(StatusCode::CONFLICT);
    let body: Value = second.json();
    assert_eq!(body["status"], "crawling");

    assert_eq!(app.finish_crawl().await, Some(DailyCrawlStatus::Completed));

    let third = app.server.get("/api/crawler/daily/").await;
    third.assert_status_ok();
    let body: Value = third.json();
    assert_eq!(body["status"], "cached");
    assert_eq!(body["total_articles"], 3);
    assert_eq!(body["article_ids"].as_array().unwrap().len(), 3);
    assert_eq!(body["crawl_date"].as_str().unwrap().len(), 10);
}

#[tokio::test]
async fn test_status_reflects_finished_crawl() {
    let app = create_test_app(2);

    let before: Value = app.server.get("/api/crawler/status/").await.json();
    assert_eq!(before["task_status"], "not_started");
    assert_eq!(before["locked"], false);

    app.server
        .get("/api/crawler/daily/")
        .await
        .assert_status(StatusCode::ACCEPTED);
    app.finish_crawl().await;

    let after: Value = app.server.get("/api/crawler/status/").await.json();
    assert_eq!(after["task_status"], "completed");
    assert_eq!(after["crawl_status"], "completed");
    assert_eq!(after["locked"], false);
    assert_eq!(after["articles_count"], 2);
    assert_eq!(after["total_links"], 2);
    assert_eq!(after["success_count"], 2);
    assert_eq!(after["failed_count"], 0);
    assert_eq!(after["total_tasks"], 1);
}

#[tokio::test]
async fn test_empty_discovery_marks_day_failed_and_allows_retry() {
    let app = create_test_app(0);

    app.server
        .get("/api/crawler/daily/")
        .await
        .assert_status(StatusCode::ACCEPTED);
    assert_eq!(app.finish_crawl().await, Some(DailyCrawlStatus::Failed));

    let status: Value = app.server.get("/api/crawler/status/").await.json();
    assert_eq!(status["task_status"], "failed");

    // 失败后锁已释放，可以重新发起
    app.server
        .get("/api/crawler/daily/")
        .await
        .assert_status(StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_stats_after_crawl() {
    let app = create_test_app(2);

    app.server.get("/api/crawler/daily/").await;
    app.finish_crawl().await;

    let stats: Value = app.server.get("/api/crawler/stats").await.json();
    assert_eq!(stats["today_articles_count"], 2);
    assert_eq!(stats["total_tasks_count"], 1);
    assert_eq!(stats["recent_tasks"].as_array().unwrap().len(), 1);
    assert!(stats["image_cache"].is_object());
}
