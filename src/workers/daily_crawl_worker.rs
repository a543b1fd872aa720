// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CrawlerSettings;
use crate::domain::repositories::article_repository::ArticleRepository;
use crate::domain::services::crawl_orchestrator::{CrawlOrchestrator, DailyCrawlOutcome};
use crate::utils::time::now_in;
use crate::workers::worker::{Worker, WorkerError};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Timelike};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 每日爬取工作器
///
/// 定期清理过期文章、重置前一天遗留的锁和状态，到点后触发当天的爬取
pub struct DailyCrawlWorker {
    orchestrator: Arc<CrawlOrchestrator>,
    articles: Arc<dyn ArticleRepository>,
    schedule_hour: u32,
    interval: Duration,
    offset: FixedOffset,
}

impl DailyCrawlWorker {
    pub fn new(
        orchestrator: Arc<CrawlOrchestrator>,
        articles: Arc<dyn ArticleRepository>,
        settings: &CrawlerSettings,
        offset: FixedOffset,
    ) -> Self {
        Self {
            orchestrator,
            articles,
            schedule_hour: settings.schedule_hour,
            interval: Duration::from_secs(settings.schedule_check_secs.max(1)),
            offset,
        }
    }

    /// 执行一次检查
    ///
    /// # 参数
    ///
    /// * `now` - 当前本地时间
    ///
    /// # 返回值
    ///
    /// 未到触发时间时返回 `Ok(None)`
    pub async fn tick(&self, now: DateTime<FixedOffset>) -> Result<Option<DailyCrawlOutcome>, WorkerError> {
        let deleted = self.articles.clear_old(1).await?;
        if deleted > 0 {
            info!(deleted, "cleared articles from previous days");
        }

        if let Some(yesterday) = now.date_naive().pred_opt() {
            self.orchestrator.reset_day(yesterday).await?;
        }

        if now.hour() < self.schedule_hour {
            return Ok(None);
        }

        let outcome = self.orchestrator.clone().start_daily_crawl().await?;
        if let DailyCrawlOutcome::Started(task) = &outcome {
            info!(task_id = %task.id, "scheduled daily crawl started");
        }
        Ok(Some(outcome))
    }
}

#[async_trait]
impl Worker for DailyCrawlWorker {
    async fn run_once(&self) -> Result<(), WorkerError> {
        self.tick(now_in(self.offset)).await.map(|_| ())
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn name(&self) -> &'static str {
        "daily_crawl"
    }
}

#[cfg(test)]
#[path = "daily_crawl_worker_test.rs"]
mod tests;
