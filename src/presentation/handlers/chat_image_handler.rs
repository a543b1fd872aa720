// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::domain::services::image_cache_service::{ImageCacheService, ImageUpload};
use crate::presentation::errors::AppError;

/// 上传文件名，需要百分号编码
const FILENAME_HEADER: &str = "x-filename";

fn upload_url(id: &str) -> String {
    format!("/api/chat/images/{}", id)
}

/// 上传单张图片，请求体为原始字节
pub async fn upload_image(
    Extension(images): Extension<Arc<ImageCacheService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    if body.is_empty() {
        return Err(AppError::bad_request("Empty image body"));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let filename = headers
        .get(FILENAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        });

    let info = images
        .cache_upload(&body, filename.as_deref(), content_type)
        .await?;
    let url = upload_url(&info.id);
    Ok((StatusCode::CREATED, Json(json!({ "image": info, "url": url }))).into_response())
}

/// 批量上传中的一张图片
#[derive(Debug, Deserialize, Validate)]
pub struct EncodedImage {
    /// base64 编码的图片数据
    #[validate(length(min = 1))]
    pub data: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchUploadRequest {
    #[validate(nested)]
    pub images: Vec<EncodedImage>,
}

/// 批量上传图片
pub async fn upload_images(
    Extension(images): Extension<Arc<ImageCacheService>>,
    Json(request): Json<BatchUploadRequest>,
) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::bad_request(format!("Validation error: {}", e)))?;
    if request.images.is_empty() {
        return Err(AppError::bad_request("No images provided"));
    }

    let mut uploads = Vec::with_capacity(request.images.len());
    for (index, image) in request.images.into_iter().enumerate() {
        let bytes = BASE64
            .decode(image.data.trim())
            .map_err(|_| AppError::bad_request(format!("Image {} is not valid base64", index)))?;
        uploads.push(ImageUpload {
            bytes,
            filename: image.filename,
            content_type: image.content_type,
        });
    }

    let result = images.cache_uploads(uploads).await?;
    let status = if result.uploaded.is_empty() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(result)).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatImageQuery {
    /// 为 `data_url` 时返回 JSON 形式的 data URL
    pub format: Option<String>,
}

/// 获取上传的图片
pub async fn get_chat_image(
    Extension(images): Extension<Arc<ImageCacheService>>,
    Path(image_id): Path<String>,
    Query(query): Query<ChatImageQuery>,
) -> Result<Response, AppError> {
    if query.format.as_deref() == Some("data_url") {
        let data_url = images
            .upload_data_url(&image_id)
            .await?
            .ok_or_else(|| AppError::not_found("Image"))?;
        return Ok(Json(json!({ "id": image_id, "data_url": data_url })).into_response());
    }

    let (data, content_type) = images
        .get_upload_data(&image_id)
        .await?
        .ok_or_else(|| AppError::not_found("Image"))?;
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        data,
    )
        .into_response())
}

/// 删除上传的图片
pub async fn delete_chat_image(
    Extension(images): Extension<Arc<ImageCacheService>>,
    Path(image_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if images.delete_upload(&image_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Image"))
    }
}
