// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, png_bytes};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::StatusCode;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Value};

#[tokio::test]
async fn test_upload_fetch_and_delete_image() {
    let app = create_test_app(0);
    let png = png_bytes(4, 3);

    let uploaded = app
        .server
        .post("/api/chat/images")
        .content_type("image/png")
        .add_header(
            HeaderName::from_static("x-filename"),
            HeaderValue::from_static("%E6%88%AA%E5%9B%BE.png"),
        )
        .bytes(Bytes::from(png.clone()))
        .await;
    uploaded.assert_status(StatusCode::CREATED);
    let body: Value = uploaded.json();
    let id = body["image"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["image"]["filename"], "截图.png");
    assert_eq!(body["image"]["width"], 4);
    assert_eq!(body["image"]["height"], 3);
    assert_eq!(body["image"]["content_type"], "image/png");
    assert_eq!(body["url"], format!("/api/chat/images/{}", id));

    let fetched = app.server.get(&format!("/api/chat/images/{}", id)).await;
    fetched.assert_status_ok();
    assert_eq!(fetched.header("content-type"), "image/png");
    assert_eq!(fetched.as_bytes().to_vec(), png);

    let data_url: Value = app
        .server
        .get(&format!("/api/chat/images/{}", id))
        .add_query_param("format", "data_url")
        .await
        .json();
    assert!(data_url["data_url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));

    app.server
        .delete(&format!("/api/chat/images/{}", id))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .get(&format!("/api/chat/images/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .delete(&format!("/api/chat/images/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_rejects_non_images() {
    let app = create_test_app(0);

    app.server
        .post("/api/chat/images")
        .content_type("text/plain")
        .bytes(Bytes::from_static(b"hello"))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/api/chat/images")
        .content_type("image/png")
        .bytes(Bytes::from_static(b"definitely not a png"))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/api/chat/images")
        .content_type("image/png")
        .bytes(Bytes::new())
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_upload_reports_each_image() {
    let app = create_test_app(0);

    let response = app
        .server
        .post("/api/chat/images/batch")
        .json(&json!({
            "images": [
                { "data": BASE64.encode(png_bytes(2, 2)), "filename": "a.png" },
                { "data": BASE64.encode(b"plain text"), "filename": "b.txt" },
            ]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["uploaded"].as_array().unwrap().len(), 1);
    assert_eq!(body["uploaded"][0]["filename"], "a.png");
    assert_eq!(body["failed"].as_array().unwrap().len(), 1);
    assert_eq!(body["failed"][0]["index"], 1);
}

#[tokio::test]
async fn test_batch_upload_rejects_empty_and_oversized_requests() {
    let app = create_test_app(0);

    app.server
        .post("/api/chat/images/batch")
        .json(&json!({ "images": [] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let too_many: Vec<Value> = (0..6)
        .map(|n| json!({ "data": BASE64.encode(png_bytes(n + 1, 1)) }))
        .collect();
    app.server
        .post("/api/chat/images/batch")
        .json(&json!({ "images": too_many }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

/// 合法 PNG 头后补零，直到总长度为 `len`
fn padded_png(len: usize) -> Vec<u8> {
    let mut png = png_bytes(8, 8);
    png.resize(len, 0);
    png
}

#[tokio::test]
async fn test_upload_accepts_images_above_default_body_limit() {
    let app = create_test_app(0);

    let response = app
        .server
        .post("/api/chat/images")
        .content_type("image/png")
        .bytes(Bytes::from(padded_png(3 * 1024 * 1024)))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["image"]["size_bytes"], 3 * 1024 * 1024);

    app.server
        .post("/api/chat/images")
        .content_type("image/png")
        .bytes(Bytes::from(padded_png(6 * 1024 * 1024)))
        .await
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_batch_upload_accepts_large_encoded_images() {
    let app = create_test_app(0);

    let images: Vec<Value> = (0..2)
        .map(|n| json!({ "data": BASE64.encode(padded_png(3 * 1024 * 1024 + n)) }))
        .collect();
    let response = app
        .server
        .post("/api/chat/images/batch")
        .json(&json!({ "images": images }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["uploaded"].as_array().unwrap().len(), 2);
    assert!(body["failed"].as_array().unwrap().is_empty());
}
