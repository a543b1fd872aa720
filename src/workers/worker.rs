// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::RepositoryError;
use crate::domain::services::crawl_orchestrator::CrawlError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("仓库错误: {0}")]
    Repository(#[from] RepositoryError),

    #[error("爬取错误: {0}")]
    Crawl(#[from] CrawlError),
}

/// 周期性后台工作器
///
/// 实现方只负责单次检查，调度循环由 `spawn` 提供
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// 执行一次检查
    async fn run_once(&self) -> Result<(), WorkerError>;

    /// 两次检查之间的间隔
    fn interval(&self) -> Duration;

    /// 获取工作器名称
    fn name(&self) -> &'static str;

    /// 在后台按固定间隔运行，单次失败只记录日志
    fn spawn(self) -> JoinHandle<()>
    where
        Self: Sized,
    {
        tokio::spawn(async move {
            let interval = self.interval();
            info!(
                worker = self.name(),
                interval_secs = interval.as_secs(),
                "worker started"
            );

            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    error!(worker = self.name(), "worker check failed: {}", e);
                }
            }
        })
    }
}
