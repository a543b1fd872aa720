// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CrawlerSettings;
use crate::domain::models::article::{ArticleFilter, ArticleStatus};
use crate::domain::models::crawl_state::{DailyCrawlStatus, LinkCandidate};
use crate::domain::models::crawl_task::CrawlTask;
use crate::domain::models::DomainError;
use crate::domain::repositories::article_repository::ArticleRepository;
use crate::domain::repositories::crawl_state_repository::CrawlStateRepository;
use crate::domain::repositories::crawl_task_repository::CrawlTaskRepository;
use crate::domain::repositories::RepositoryError;
use crate::domain::services::article_extractor::ArticleSource;
use crate::domain::services::link_discovery::LinkSource;
use crate::utils::time::{day_key, now_in, today_in};
use chrono::{FixedOffset, NaiveDate};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// 爬取错误
#[derive(Error, Debug)]
pub enum CrawlError {
    /// 没有发现任何链接
    #[error("No article links discovered")]
    DiscoveryFailed,
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Task error: {0}")]
    Task(#[from] DomainError),
}

/// 请求当日爬取的结果
#[derive(Debug, Clone, PartialEq)]
pub enum DailyCrawlOutcome {
    /// 当天已有成功文章，返回其ID
    AlreadyCrawled(Vec<String>),
    /// 已有运行中的爬取
    InProgress,
    /// 获得锁并创建了新任务
    Started(CrawlTask),
}

/// 当日爬取进度快照，允许过时
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStatusSnapshot {
    pub date: String,
    pub status: Option<DailyCrawlStatus>,
    pub locked: bool,
    pub article_count: usize,
    pub latest_task: Option<CrawlTask>,
}

/// 每日爬取编排器
///
/// 用每日锁保证同一天最多只有一次爬取，逐篇串行处理，单篇失败不影响整体
pub struct CrawlOrchestrator {
    articles: Arc<dyn ArticleRepository>,
    tasks: Arc<dyn CrawlTaskRepository>,
    state: Arc<dyn CrawlStateRepository>,
    links: Arc<dyn LinkSource>,
    extractor: Arc<dyn ArticleSource>,
    settings: CrawlerSettings,
    offset: FixedOffset,
    owner: String,
}

impl CrawlOrchestrator {
    /// 创建编排器
    ///
    /// # 参数
    ///
    /// * `articles` - 文章仓库
    /// * `tasks` - 任务仓库
    /// * `state` - 每日锁与状态
    /// * `links` - 链接来源
    /// * `extractor` - 文章来源
    /// * `settings` - 爬虫配置
    /// * `offset` - 计算日历日使用的时区
    pub fn new(
        articles: Arc<dyn ArticleRepository>,
        tasks: Arc<dyn CrawlTaskRepository>,
        state: Arc<dyn CrawlStateRepository>,
        links: Arc<dyn LinkSource>,
        extractor: Arc<dyn ArticleSource>,
        settings: CrawlerSettings,
        offset: FixedOffset,
    ) -> Self {
        Self {
            articles,
            tasks,
            state,
            links,
            extractor,
            settings,
            offset,
            owner: Uuid::new_v4().to_string(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        today_in(self.offset)
    }

    /// 指定日期成功提取的文章ID，按创建时间倒序
    pub async fn article_ids(&self, day: NaiveDate) -> Result<Vec<String>, CrawlError> {
        let filter = ArticleFilter::for_day(day).with_status(ArticleStatus::Success);
        let articles = self.articles.filter(&filter).await?;
        Ok(articles.into_iter().map(|a| a.id).collect())
    }

    /// 尝试开始指定日期的爬取
    ///
    /// 已有结果时直接返回；状态为运行中且锁仍在时不尝试加锁；
    /// 加锁失败说明其他进程抢先一步
    ///
    /// # 返回值
    ///
    /// * `Ok(DailyCrawlOutcome)` - 已爬取、进行中或新任务
    /// * `Err(CrawlError)` - 存储错误
    pub async fn try_begin(&self, day: NaiveDate) -> Result<DailyCrawlOutcome, CrawlError> {
        let ids = self.article_ids(day).await?;
        if !ids.is_empty() {
            return Ok(DailyCrawlOutcome::AlreadyCrawled(ids));
        }

        // 持有者崩溃时标记可能残留，只有锁仍在才算进行中
        if self.state.get_status(day).await? == Some(DailyCrawlStatus::Running)
            && self.state.is_locked(day).await?
        {
            return Ok(DailyCrawlOutcome::InProgress);
        }

        if !self.state.try_acquire_lock(day, &self.owner).await? {
            info!(date = %day, "crawl lock held elsewhere");
            return Ok(DailyCrawlOutcome::InProgress);
        }

        match self.create_task(day).await {
            Ok(task) => {
                info!(date = %day, task_id = %task.id, "daily crawl started");
                Ok(DailyCrawlOutcome::Started(task))
            }
            Err(e) => {
                self.release(day).await;
                Err(e)
            }
        }
    }

    async fn create_task(&self, day: NaiveDate) -> Result<CrawlTask, CrawlError> {
        self.state.set_status(day, DailyCrawlStatus::Running).await?;
        let now = now_in(self.offset);
        let task = CrawlTask::new(
            format!("每日新闻爬取 {}", day_key(day)),
            &self.settings.task_target_url,
            now,
        )
        .start(now)?;
        self.tasks.create(&task).await?;
        Ok(task)
    }

    async fn release(&self, day: NaiveDate) {
        match self.state.release_lock(day, &self.owner).await {
            Ok(true) => {}
            Ok(false) => warn!(date = %day, "crawl lock expired before release"),
            Err(e) => error!(date = %day, "Failed to release crawl lock: {}", e),
        }
    }

    /// 请求今天的爬取，获得锁时在后台执行
    pub async fn start_daily_crawl(self: Arc<Self>) -> Result<DailyCrawlOutcome, CrawlError> {
        let day = self.today();
        let outcome = self.try_begin(day).await?;
        if let DailyCrawlOutcome::Started(task) = &outcome {
            let task = task.clone();
            let orchestrator = self.clone();
            tokio::spawn(async move {
                orchestrator.run(day, task).await;
            });
        }
        Ok(outcome)
    }

    /// 执行一次已开始的爬取
    ///
    /// 无论成功与否都会写回任务和当日状态，并释放锁
    pub async fn run(&self, day: NaiveDate, mut task: CrawlTask) -> CrawlTask {
        let started = Instant::now();
        let result = self.crawl(&mut task).await;

        let now = now_in(self.offset);
        let (finished, status, outcome) = match result {
            Ok(()) => (task.clone().complete(now), DailyCrawlStatus::Completed, "completed"),
            Err(e) => {
                error!(task_id = %task.id, "daily crawl failed: {}", e);
                (task.clone().fail(e.to_string(), now), DailyCrawlStatus::Failed, "failed")
            }
        };
        let task = finished.unwrap_or(task);

        if let Err(e) = self.tasks.update(&task).await {
            error!(task_id = %task.id, "Failed to persist task: {}", e);
        }
        if let Err(e) = self.state.set_status(day, status).await {
            error!(date = %day, "Failed to record crawl status: {}", e);
        }
        self.release(day).await;

        metrics::counter!("newsrs_crawl_runs_total", "outcome" => outcome).increment(1);
        metrics::histogram!("newsrs_crawl_duration_seconds").record(started.elapsed().as_secs_f64());
        info!(
            task_id = %task.id,
            total = task.total_links,
            success = task.success_count,
            failed = task.failed_count,
            outcome,
            "daily crawl finished"
        );
        task
    }

    async fn crawl(&self, task: &mut CrawlTask) -> Result<(), CrawlError> {
        let links = self.links.discover().await;
        if links.is_empty() {
            return Err(CrawlError::DiscoveryFailed);
        }

        task.total_links = links.len();
        self.save_progress(task).await;

        let delay = Duration::from_millis(self.settings.request_delay_ms);
        for (index, link) in links.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(delay).await;
            }
            if self.process(link).await {
                task.record_success();
            } else {
                task.record_failure();
            }
            self.save_progress(task).await;
        }

        Ok(())
    }

    /// 处理单篇文章，任何失败（包括 panic）都只计入失败数
    async fn process(&self, link: &LinkCandidate) -> bool {
        let extracted = AssertUnwindSafe(async { self.extractor.extract(link).await })
            .catch_unwind()
            .await;

        let saved = match extracted {
            Ok(Some(article)) => match self.articles.save(article).await {
                Ok(id) => {
                    info!(article_id = %id, url = %link.url, "article saved");
                    true
                }
                Err(e) => {
                    error!(url = %link.url, "Failed to save article: {}", e);
                    false
                }
            },
            Ok(None) => {
                warn!(url = %link.url, "article extraction failed");
                false
            }
            Err(_) => {
                error!(url = %link.url, "article extraction panicked");
                false
            }
        };

        if saved {
            metrics::counter!("newsrs_articles_saved_total").increment(1);
        } else {
            metrics::counter!("newsrs_articles_failed_total").increment(1);
        }
        saved
    }

    async fn save_progress(&self, task: &CrawlTask) {
        if let Err(e) = self.tasks.update(task).await {
            warn!(task_id = %task.id, "Failed to update task progress: {}", e);
        }
    }

    /// 清理某天遗留的锁和状态，用于跨天自愈
    pub async fn reset_day(&self, day: NaiveDate) -> Result<(), CrawlError> {
        self.state.force_release_lock(day).await?;
        self.state.clear_status(day).await?;
        Ok(())
    }

    /// 当日爬取进度
    pub async fn status(&self) -> Result<CrawlStatusSnapshot, CrawlError> {
        let day = self.today();
        let article_count = self
            .articles
            .count(&ArticleFilter::for_day(day).with_status(ArticleStatus::Success))
            .await?;
        Ok(CrawlStatusSnapshot {
            date: day_key(day),
            status: self.state.get_status(day).await?,
            locked: self.state.is_locked(day).await?,
            article_count,
            latest_task: self.tasks.recent(1).await?.into_iter().next(),
        })
    }
}

#[cfg(test)]
#[path = "crawl_orchestrator_test.rs"]
mod tests;
