// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// 图片缓存条目
///
/// `id` 是身份键（规范化URL或原始字节）的指纹，同一身份始终映射到同一条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCacheEntry {
    pub id: String,
    /// 来源地址，上传图片为空
    pub source: Option<String>,
    /// 上传时的原始文件名
    pub filename: Option<String>,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
    /// 解码得到的格式，如 `jpeg`
    pub format: String,
    pub size_bytes: u64,
    /// base64 编码的图片数据
    pub data: String,
    pub created_at: DateTime<FixedOffset>,
}

/// 上传图片的描述信息，不含数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: String,
    pub filename: Option<String>,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub size_bytes: u64,
}

impl From<&ImageCacheEntry> for ImageInfo {
    fn from(entry: &ImageCacheEntry) -> Self {
        Self {
            id: entry.id.clone(),
            filename: entry.filename.clone(),
            content_type: entry.content_type.clone(),
            width: entry.width,
            height: entry.height,
            format: entry.format.clone(),
            size_bytes: entry.size_bytes,
        }
    }
}

/// 图片缓存统计
///
/// 条目多于采样数时，总大小按采样平均值线性外推，`approximate` 为 true
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageCacheStats {
    pub total_images: usize,
    pub uploaded_images: usize,
    pub sampled: usize,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    pub approximate: bool,
}
