// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::AsyncCommands;

use super::kv_store::KeyValueStore;

/// 值相等时才删除
static DEL_IF_EQ: Lazy<redis::Script> = Lazy::new(|| {
    redis::Script::new(
        r#"if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end"#,
    )
});

/// Redis客户端
///
/// 提供对Redis数据库的异步操作接口
#[derive(Clone)]
pub struct RedisClient {
    /// Redis客户端
    client: redis::Client,
}

impl RedisClient {
    /// 创建新的Redis客户端实例
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    ///
    /// # 返回值
    ///
    /// * `Ok(RedisClient)` - Redis客户端实例
    /// * `Err(anyhow::Error)` - 创建过程中出现的错误
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl KeyValueStore for RedisClient {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut con = self.connection().await?;
        let value: Option<String> = con.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut con = self.connection().await?;
        con.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn set_keep_ttl(&self, key: &str, value: &str) -> Result<()> {
        let mut con = self.connection().await?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("KEEPTTL")
            .query_async::<()>(&mut con)
            .await?;
        Ok(())
    }

    /// 使用 `SET key value NX EX ttl` 原子地获取锁
    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        let mut con = self.connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut con)
            .await?;
        Ok(reply.is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut con = self.connection().await?;
        let exists: bool = con.exists(key).await?;
        Ok(exists)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut con = self.connection().await?;
        let removed: i64 = con.del(key).await?;
        Ok(removed > 0)
    }

    async fn del_if_eq(&self, key: &str, value: &str) -> Result<bool> {
        let mut con = self.connection().await?;
        let removed: i64 = DEL_IF_EQ.key(key).arg(value).invoke_async(&mut con).await?;
        Ok(removed > 0)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        let mut con = self.connection().await?;
        let applied: bool = con.expire(key, ttl_secs as i64).await?;
        Ok(applied)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        let mut con = self.connection().await?;
        con.sadd::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<()> {
        let mut con = self.connection().await?;
        con.srem::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let mut con = self.connection().await?;
        let members: Vec<String> = con.smembers(key).await?;
        Ok(members)
    }

    async fn scard(&self, key: &str) -> Result<usize> {
        let mut con = self.connection().await?;
        let count: usize = con.scard(key).await?;
        Ok(count)
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        let mut con = self.connection().await?;
        con.lpush::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn ltrim(&self, key: &str, start: isize, stop: isize) -> Result<()> {
        let mut con = self.connection().await?;
        con.ltrim::<_, ()>(key, start, stop).await?;
        Ok(())
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut con = self.connection().await?;
        let values: Vec<String> = con.lrange(key, start, stop).await?;
        Ok(values)
    }

    async fn llen(&self, key: &str) -> Result<usize> {
        let mut con = self.connection().await?;
        let len: usize = con.llen(key).await?;
        Ok(len)
    }

    /// 使用游标 `SCAN` 遍历，避免 `KEYS` 阻塞服务端
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut con = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(500)
                .query_async(&mut con)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
