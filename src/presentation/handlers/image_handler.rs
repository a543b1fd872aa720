// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Path},
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::domain::services::image_cache_service::{ImageCache, ImageCacheService};
use crate::presentation::errors::AppError;

/// 获取缓存的文章图片
pub async fn get_cached_image(
    Extension(images): Extension<Arc<ImageCacheService>>,
    Path(image_id): Path<String>,
) -> Result<Response, AppError> {
    let (data, content_type) = images
        .get_data(&image_id)
        .await?
        .ok_or_else(|| AppError::not_found("Image"))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", image_id),
            ),
        ],
        data,
    )
        .into_response())
}
