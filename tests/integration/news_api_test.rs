// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{article, create_test_app};
use axum::http::StatusCode;
use newsrs::domain::repositories::article_repository::ArticleRepository;
use serde_json::Value;

#[tokio::test]
async fn test_health_and_version() {
    let app = create_test_app(0);

    let health = app.server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.text(), "OK");

    let version = app.server.get("/v1/version").await;
    version.assert_status_ok();
    assert!(!version.text().is_empty());
}

#[tokio::test]
async fn test_article_markdown_not_found() {
    let app = create_test_app(0);

    let response = app.server.get("/api/crawler/article/article_missing/").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn test_article_markdown_document() {
    let app = create_test_app(0);
    let id = app
        .articles
        .save(article("经济运行稳中向好", "http://finance.people.com.cn/n1/2025/0901/c1004-1.html"))
        .await
        .unwrap();

    let response = app.server.get(&format!("/api/crawler/article/{}/", id)).await;
    response.assert_status_ok();
    let content_type = response.header("content-type");
    assert!(content_type.to_str().unwrap().starts_with("text/markdown"));
    let disposition = response.header("content-disposition");
    assert!(disposition.to_str().unwrap().starts_with("inline; filename*=UTF-8''"));

    let body = response.text();
    assert!(body.starts_with("# 经济运行稳中向好"));
    assert!(body.contains("**来源**: 人民网"));
    assert!(body.contains("**分类**: 经济·科技"));
    assert!(body.contains("**原文链接**: [http://finance.people.com.cn/n1/2025/0901/c1004-1.html"));
    assert!(body.contains("正文内容"));

    app.server.get(&format!("/api/crawler/article/{}/", id)).await;
    let stored = app.articles.peek(&id).await.unwrap().unwrap();
    assert_eq!(stored.view_count, 2);
}

#[tokio::test]
async fn test_list_articles_filters_and_searches() {
    let app = create_test_app(0);
    app.articles
        .save(article("经济运行稳中向好", "http://finance.people.com.cn/n1/a.html"))
        .await
        .unwrap();
    let mut sports = article("全运会开幕", "http://sports.people.com.cn/n1/b.html");
    sports.category = "文旅·体育".to_string();
    sports.raw_content = "全运会在广东开幕".to_string();
    app.articles.save(sports).await.unwrap();

    let all: Value = app.server.get("/api/crawler/articles").await.json();
    assert_eq!(all["total"], 2);

    let sport_only: Value = app
        .server
        .get("/api/crawler/articles")
        .add_query_param("category", "文旅·体育")
        .await
        .json();
    assert_eq!(sport_only["total"], 1);
    assert_eq!(sport_only["articles"][0]["title"], "全运会开幕");

    let searched: Value = app
        .server
        .get("/api/crawler/articles")
        .add_query_param("q", "经济")
        .await
        .json();
    assert_eq!(searched["total"], 1);
    assert_eq!(searched["articles"][0]["title"], "经济运行稳中向好");

    let limited: Value = app
        .server
        .get("/api/crawler/articles")
        .add_query_param("limit", "1")
        .await
        .json();
    assert_eq!(limited["total"], 2);
    assert_eq!(limited["articles"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_articles_rejects_bad_query() {
    let app = create_test_app(0);

    app.server
        .get("/api/crawler/articles")
        .add_query_param("limit", "0")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    app.server
        .get("/api/crawler/articles")
        .add_query_param("date", "2025/09/01")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    app.server
        .get("/api/crawler/articles")
        .add_query_param("status", "unknown")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cached_image_not_found() {
    let app = create_test_app(0);

    app.server
        .get("/api/crawler/image/img_missing/")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
