// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 缓存模块
///
/// 提供键值存储接口及其 Redis 和内存实现
pub mod kv_store;
pub mod memory_store;
pub mod redis_client;

use std::sync::Arc;

use kv_store::KeyValueStore;
use memory_store::MemoryStore;
use redis_client::RedisClient;

/// 根据URL创建键值存储
///
/// `memory://` 使用进程内存储，其余按 Redis URL 处理
pub async fn connect(url: &str) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    if url.starts_with("memory://") {
        Ok(Arc::new(MemoryStore::new()))
    } else {
        Ok(Arc::new(RedisClient::new(url).await?))
    }
}
