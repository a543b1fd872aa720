// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::models::crawl_task::CrawlTask;

/// 爬取任务仓库特质
#[async_trait]
pub trait CrawlTaskRepository: Send + Sync {
    /// 创建任务并加入最近任务列表
    async fn create(&self, task: &CrawlTask) -> Result<(), RepositoryError>;

    async fn update(&self, task: &CrawlTask) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<CrawlTask>, RepositoryError>;

    /// 最近的任务，按创建时间倒序
    async fn recent(&self, limit: usize) -> Result<Vec<CrawlTask>, RepositoryError>;

    /// 最近任务列表中的任务数
    async fn count(&self) -> Result<usize, RepositoryError>;
}
