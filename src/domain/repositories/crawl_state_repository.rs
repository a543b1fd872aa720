// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::RepositoryError;
use crate::domain::models::crawl_state::DailyCrawlStatus;

/// 每日爬取锁与状态标记
#[async_trait]
pub trait CrawlStateRepository: Send + Sync {
    /// 原子地尝试获取当日锁，返回是否获取成功
    async fn try_acquire_lock(&self, day: NaiveDate, owner: &str) -> Result<bool, RepositoryError>;

    /// 释放当日锁，仅当锁仍属于 `owner` 时生效
    ///
    /// 返回是否确实删除了锁
    async fn release_lock(&self, day: NaiveDate, owner: &str) -> Result<bool, RepositoryError>;

    /// 不论持有者是谁都删除锁，用于清理已经过去的日期
    async fn force_release_lock(&self, day: NaiveDate) -> Result<(), RepositoryError>;

    async fn is_locked(&self, day: NaiveDate) -> Result<bool, RepositoryError>;

    async fn get_status(&self, day: NaiveDate) -> Result<Option<DailyCrawlStatus>, RepositoryError>;

    /// 写入状态标记
    ///
    /// `running` 与锁同寿命，持有者崩溃后不会比锁活得更久
    async fn set_status(&self, day: NaiveDate, status: DailyCrawlStatus) -> Result<(), RepositoryError>;

    async fn clear_status(&self, day: NaiveDate) -> Result<(), RepositoryError>;
}
