// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;

/// 键值存储接口
///
/// 覆盖文章、任务、锁和图片缓存所需的全部操作。
/// 每个操作在单键级别上是原子的，跨键不提供事务。
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 读取字符串值
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 写入字符串值并设置过期时间
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// 覆盖字符串值但保留原有的剩余过期时间
    async fn set_keep_ttl(&self, key: &str, value: &str) -> Result<()>;

    /// 仅在键不存在时写入，返回是否写入成功
    ///
    /// 检查与写入是一个原子操作，用作分布式锁
    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// 删除键，返回键是否存在过
    async fn del(&self, key: &str) -> Result<bool>;

    /// 仅当键的当前值等于 `value` 时删除，比较与删除是一个原子操作
    ///
    /// 用于释放锁：持有者超时后不会删掉后来者的锁
    async fn del_if_eq(&self, key: &str, value: &str) -> Result<bool>;

    /// 设置过期时间，键不存在时返回false
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool>;

    async fn sadd(&self, key: &str, member: &str) -> Result<()>;

    async fn srem(&self, key: &str, member: &str) -> Result<()>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    async fn scard(&self, key: &str) -> Result<usize>;

    async fn lpush(&self, key: &str, value: &str) -> Result<()>;

    /// 按 Redis 语义裁剪列表，支持负数下标
    async fn ltrim(&self, key: &str, start: isize, stop: isize) -> Result<()>;

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;

    async fn llen(&self, key: &str) -> Result<usize>;

    /// 按 glob 模式列出键
    ///
    /// 开销与键空间大小成正比，只用于统计
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;
}
