// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::repositories::RepositoryError;
use crate::domain::services::image_cache_service::ImageCacheError;

/// 需要区别对待的请求错误
///
/// 客户端轮询依赖于区分"稍后再试"与"失败"
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    InProgress(String),
    #[error("{0}")]
    BadRequest(String),
}

/// 应用错误类型
///
/// 封装所有可能的应用层错误，提供统一的错误处理接口
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self(RequestError::NotFound(what.into()).into())
    }

    pub fn in_progress(message: impl Into<String>) -> Self {
        Self(RequestError::InProgress(message.into()).into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(RequestError::BadRequest(message.into()).into())
    }

    fn status(&self) -> StatusCode {
        if let Some(err) = self.0.downcast_ref::<RequestError>() {
            return match err {
                RequestError::NotFound(_) => StatusCode::NOT_FOUND,
                RequestError::InProgress(_) => StatusCode::CONFLICT,
                RequestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            };
        }
        if let Some(RepositoryError::NotFound) = self.0.downcast_ref::<RepositoryError>() {
            return StatusCode::NOT_FOUND;
        }
        match self.0.downcast_ref::<ImageCacheError>() {
            Some(
                ImageCacheError::NotAnImage(_)
                | ImageCacheError::TooLarge(_)
                | ImageCacheError::UnsupportedFormat(_)
                | ImageCacheError::Decode(_)
                | ImageCacheError::TooMany(_),
            ) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.0.to_string();

        let body = match status {
            StatusCode::CONFLICT => json!({ "status": "crawling", "message": message }),
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Request failed: {:#}", self.0);
                json!({ "error": message })
            }
            _ => json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
