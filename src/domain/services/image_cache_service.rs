// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 图片缓存服务
//!
//! 图片按身份键的 SHA-256 指纹寻址：抓取的图片以规范化URL为身份键，
//! 上传的图片以原始字节为身份键。指纹相同的请求在有效期内只会下载一次。

use crate::config::settings::ImageSettings;
use crate::domain::models::image::{ImageCacheEntry, ImageCacheStats, ImageInfo};
use crate::domain::repositories::RepositoryError;
use crate::engines::reqwest_engine::BROWSER_USER_AGENT;
use crate::infrastructure::cache::kv_store::KeyValueStore;
use crate::infrastructure::repositories::keys;
use crate::utils::time::now_in;
use crate::utils::url_utils::canonical_url;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::FixedOffset;
use dashmap::DashMap;
use image::{ImageFormat, ImageReader};
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// 图片缓存错误
#[derive(Error, Debug)]
pub enum ImageCacheError {
    #[error("Image request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected status: {0}")]
    BadStatus(u16),
    #[error("Not an image: {0}")]
    NotAnImage(String),
    #[error("Image exceeds size limit: {0} bytes")]
    TooLarge(u64),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Image decode failed: {0}")]
    Decode(String),
    #[error("Too many images in one request: {0}")]
    TooMany(usize),
    #[error("Image store failed: {0}")]
    Store(#[from] RepositoryError),
}

impl ImageCacheError {
    /// 指标标签
    pub fn reason(&self) -> &'static str {
        match self {
            ImageCacheError::Request(_) => "request",
            ImageCacheError::BadStatus(_) => "status",
            ImageCacheError::NotAnImage(_) => "content_type",
            ImageCacheError::TooLarge(_) => "too_large",
            ImageCacheError::UnsupportedFormat(_) => "format",
            ImageCacheError::Decode(_) => "decode",
            ImageCacheError::TooMany(_) => "too_many",
            ImageCacheError::Store(_) => "store",
        }
    }
}

/// 缓存命中或写入后的图片引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    pub id: String,
    pub content_type: String,
}

/// 一次批量上传中的单张图片
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

/// 批量上传中失败的一项
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct UploadFailure {
    pub index: usize,
    pub filename: Option<String>,
    pub error: String,
}

/// 批量上传结果
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct BatchUploadResult {
    pub uploaded: Vec<ImageInfo>,
    pub failed: Vec<UploadFailure>,
}

/// 图片缓存接口
#[async_trait]
pub trait ImageCache: Send + Sync {
    /// 命中缓存时直接返回ID，否则下载、校验并写入缓存
    ///
    /// 任何拒绝都不会留下部分写入的条目
    async fn get_or_fetch(&self, url: &str, referer: Option<&str>) -> Result<CachedImage, ImageCacheError>;

    /// 返回图片数据和内容类型，条目不存在或已过期时返回 None
    async fn get_data(&self, id: &str) -> Result<Option<(Vec<u8>, String)>, ImageCacheError>;
}

/// 计算内容指纹
pub fn fingerprint(identity: &[u8]) -> String {
    hex::encode(Sha256::digest(identity))
}

/// 识别后的图片信息
struct Decoded {
    format: &'static str,
    content_type: &'static str,
    width: u32,
    height: u32,
}

/// 根据文件头识别格式并读取尺寸，仅允许 JPEG/PNG/GIF/WEBP
fn inspect(bytes: &[u8]) -> Result<Decoded, ImageCacheError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageCacheError::Decode(e.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| ImageCacheError::UnsupportedFormat("unknown".to_string()))?;
    let name = match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        other => {
            return Err(ImageCacheError::UnsupportedFormat(
                format!("{:?}", other).to_lowercase(),
            ))
        }
    };
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ImageCacheError::Decode(e.to_string()))?;

    Ok(Decoded {
        format: name,
        content_type: format.to_mime_type(),
        width,
        height,
    })
}

/// 图片缓存服务
pub struct ImageCacheService {
    store: Arc<dyn KeyValueStore>,
    client: reqwest::Client,
    settings: ImageSettings,
    /// 未显式提供 Referer 时使用
    default_referer: String,
    offset: FixedOffset,
    /// 同一指纹的并发下载互斥
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl ImageCacheService {
    /// 创建图片缓存服务
    ///
    /// # 参数
    ///
    /// * `store` - 键值存储
    /// * `settings` - 图片缓存配置
    /// * `default_referer` - 默认 Referer，源站会校验
    /// * `offset` - 记录创建时间使用的时区
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        settings: ImageSettings,
        default_referer: impl Into<String>,
        offset: FixedOffset,
    ) -> Result<Self, ImageCacheError> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            store,
            client,
            settings,
            default_referer: default_referer.into(),
            offset,
            inflight: DashMap::new(),
        })
    }

    pub fn settings(&self) -> &ImageSettings {
        &self.settings
    }

    async fn load_entry(&self, key: &str) -> Result<Option<ImageCacheEntry>, RepositoryError> {
        match self.store.get(key).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_entry(&self, key: &str, entry: &ImageCacheEntry, ttl_secs: u64) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(entry)?;
        self.store.set_ex(key, &json, ttl_secs).await?;
        Ok(())
    }

    fn decode_payload(entry: ImageCacheEntry) -> Option<(Vec<u8>, String)> {
        match BASE64.decode(entry.data.as_bytes()) {
            Ok(bytes) => Some((bytes, entry.content_type)),
            Err(e) => {
                warn!(image_id = %entry.id, "Corrupt cached payload: {}", e);
                None
            }
        }
    }

    /// 流式下载，超过上限立即中止
    async fn download(&self, url: &str, referer: &str) -> Result<Vec<u8>, ImageCacheError> {
        let mut response = self.client.get(url).header(REFERER, referer).send().await?;

        if response.status() != StatusCode::OK {
            return Err(ImageCacheError::BadStatus(response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !content_type.starts_with("image/") {
            return Err(ImageCacheError::NotAnImage(content_type));
        }

        let limit = self.settings.max_bytes;
        if let Some(declared) = response.content_length() {
            if declared > limit {
                return Err(ImageCacheError::TooLarge(declared));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let received = (body.len() + chunk.len()) as u64;
            if received > limit {
                return Err(ImageCacheError::TooLarge(received));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    async fn fetch_and_store(
        &self,
        id: &str,
        url: &str,
        referer: &str,
    ) -> Result<CachedImage, ImageCacheError> {
        let bytes = self.download(url, referer).await?;
        let decoded = inspect(&bytes)?;

        let entry = ImageCacheEntry {
            id: id.to_string(),
            source: Some(url.to_string()),
            filename: None,
            content_type: decoded.content_type.to_string(),
            width: decoded.width,
            height: decoded.height,
            format: decoded.format.to_string(),
            size_bytes: bytes.len() as u64,
            data: BASE64.encode(&bytes),
            created_at: now_in(self.offset),
        };
        self.save_entry(&keys::image(id), &entry, self.settings.ttl_secs)
            .await?;

        info!(image_id = %id, url = %url, bytes = entry.size_bytes, "image cached");
        Ok(CachedImage {
            id: id.to_string(),
            content_type: entry.content_type,
        })
    }

    /// 缓存一张上传的图片，相同字节只保存一份
    ///
    /// # 参数
    ///
    /// * `bytes` - 图片数据
    /// * `filename` - 原始文件名
    /// * `content_type` - 声明的内容类型，存在时必须是 `image/*`
    pub async fn cache_upload(
        &self,
        bytes: &[u8],
        filename: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<ImageInfo, ImageCacheError> {
        if let Some(declared) = content_type {
            if !declared.to_ascii_lowercase().starts_with("image/") {
                return Err(ImageCacheError::NotAnImage(declared.to_string()));
            }
        }
        if bytes.len() as u64 > self.settings.max_bytes {
            return Err(ImageCacheError::TooLarge(bytes.len() as u64));
        }

        let id = fingerprint(bytes);
        let key = keys::chat_image(&id);
        if let Some(existing) = self.load_entry(&key).await? {
            debug!(image_id = %id, "upload already cached");
            return Ok(ImageInfo::from(&existing));
        }

        let decoded = inspect(bytes)?;
        let entry = ImageCacheEntry {
            id: id.clone(),
            source: None,
            filename: filename.map(str::to_string),
            content_type: decoded.content_type.to_string(),
            width: decoded.width,
            height: decoded.height,
            format: decoded.format.to_string(),
            size_bytes: bytes.len() as u64,
            data: BASE64.encode(bytes),
            created_at: now_in(self.offset),
        };
        self.save_entry(&key, &entry, self.settings.upload_ttl_secs)
            .await?;

        info!(image_id = %id, bytes = entry.size_bytes, "upload cached");
        Ok(ImageInfo::from(&entry))
    }

    /// 批量上传，数量超过上限时整体拒绝，单张失败不影响其他图片
    pub async fn cache_uploads(&self, uploads: Vec<ImageUpload>) -> Result<BatchUploadResult, ImageCacheError> {
        if uploads.len() > self.settings.max_uploads_per_request {
            return Err(ImageCacheError::TooMany(uploads.len()));
        }

        let mut result = BatchUploadResult::default();
        for (index, upload) in uploads.into_iter().enumerate() {
            match self
                .cache_upload(
                    &upload.bytes,
                    upload.filename.as_deref(),
                    upload.content_type.as_deref(),
                )
                .await
            {
                Ok(info) => result.uploaded.push(info),
                Err(e) => result.failed.push(UploadFailure {
                    index,
                    filename: upload.filename,
                    error: e.to_string(),
                }),
            }
        }
        Ok(result)
    }

    /// 上传图片的数据和内容类型
    pub async fn get_upload_data(&self, id: &str) -> Result<Option<(Vec<u8>, String)>, ImageCacheError> {
        Ok(self
            .load_entry(&keys::chat_image(id))
            .await?
            .and_then(Self::decode_payload))
    }

    pub async fn get_upload_info(&self, id: &str) -> Result<Option<ImageInfo>, ImageCacheError> {
        Ok(self
            .load_entry(&keys::chat_image(id))
            .await?
            .map(|entry| ImageInfo::from(&entry)))
    }

    /// 以 `data:` URL 形式返回上传图片
    pub async fn upload_data_url(&self, id: &str) -> Result<Option<String>, ImageCacheError> {
        Ok(self
            .load_entry(&keys::chat_image(id))
            .await?
            .map(|entry| format!("data:{};base64,{}", entry.content_type, entry.data)))
    }

    pub async fn delete_upload(&self, id: &str) -> Result<bool, ImageCacheError> {
        Ok(self
            .store
            .del(&keys::chat_image(id))
            .await
            .map_err(RepositoryError::from)?)
    }

    /// 缓存统计
    ///
    /// 只读取前 `stats_sample_size` 个条目的大小并线性外推总量。
    /// 条目大小差异越大误差越大，条目数不超过采样数时结果精确。
    pub async fn get_cache_stats(&self) -> Result<ImageCacheStats, ImageCacheError> {
        let image_keys = self
            .store
            .scan_keys(keys::IMAGE_PATTERN)
            .await
            .map_err(RepositoryError::from)?;
        let upload_keys = self
            .store
            .scan_keys(keys::CHAT_IMAGE_PATTERN)
            .await
            .map_err(RepositoryError::from)?;

        let mut sampled = 0usize;
        let mut sampled_bytes = 0u64;
        for key in image_keys.iter().take(self.settings.stats_sample_size) {
            if let Some(entry) = self.load_entry(key).await? {
                sampled += 1;
                sampled_bytes += entry.size_bytes;
            }
        }

        let total = image_keys.len();
        let approximate = total > sampled;
        let total_size_bytes = if approximate && sampled > 0 {
            sampled_bytes * total as u64 / sampled as u64
        } else {
            sampled_bytes
        };

        Ok(ImageCacheStats {
            total_images: total,
            uploaded_images: upload_keys.len(),
            sampled,
            total_size_bytes,
            total_size_mb: (total_size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
            approximate,
        })
    }
}

#[async_trait]
impl ImageCache for ImageCacheService {
    async fn get_or_fetch(&self, url: &str, referer: Option<&str>) -> Result<CachedImage, ImageCacheError> {
        let canonical = canonical_url(url);
        let id = fingerprint(canonical.as_bytes());
        let key = keys::image(&id);

        let gate = self.inflight.entry(id.clone()).or_default().clone();
        let outcome = {
            let _guard = gate.lock().await;
            match self.load_entry(&key).await {
                Ok(Some(entry)) => {
                    metrics::counter!("newsrs_image_cache_hits_total").increment(1);
                    debug!(image_id = %id, "image cache hit");
                    Ok(CachedImage {
                        id: id.clone(),
                        content_type: entry.content_type,
                    })
                }
                Ok(None) => {
                    metrics::counter!("newsrs_image_cache_misses_total").increment(1);
                    let referer = referer.unwrap_or(&self.default_referer);
                    self.fetch_and_store(&id, &canonical, referer).await
                }
                Err(e) => Err(e.into()),
            }
        };
        drop(gate);
        self.inflight
            .remove_if(&id, |_, waiting| Arc::strong_count(waiting) == 1);

        if let Err(e) = &outcome {
            metrics::counter!("newsrs_image_rejected_total", "reason" => e.reason()).increment(1);
            warn!(url = %url, "image not cached: {}", e);
        }
        outcome
    }

    async fn get_data(&self, id: &str) -> Result<Option<(Vec<u8>, String)>, ImageCacheError> {
        Ok(self
            .load_entry(&keys::image(id))
            .await?
            .and_then(Self::decode_payload))
    }
}

#[cfg(test)]
#[path = "image_cache_service_test.rs"]
mod tests;
