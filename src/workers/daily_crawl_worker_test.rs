// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use crate::config::settings::Settings;
use crate::domain::models::article::Article;
use crate::domain::models::crawl_state::{DailyCrawlStatus, LinkCandidate};
use crate::domain::repositories::crawl_state_repository::CrawlStateRepository;
use crate::domain::services::article_extractor::ArticleSource;
use crate::domain::services::link_discovery::LinkSource;
use crate::infrastructure::cache::memory_store::MemoryStore;
use crate::infrastructure::repositories::article_repo_impl::ArticleRepositoryImpl;
use crate::infrastructure::repositories::crawl_state_repo_impl::CrawlStateRepositoryImpl;
use crate::infrastructure::repositories::task_repo_impl::CrawlTaskRepositoryImpl;
use crate::utils::time::offset_from_hours;

struct NoLinks;

#[async_trait]
impl LinkSource for NoLinks {
    async fn discover(&self) -> Vec<LinkCandidate> {
        Vec::new()
    }
}

struct NoArticles;

#[async_trait]
impl ArticleSource for NoArticles {
    async fn extract(&self, _link: &LinkCandidate) -> Option<Article> {
        None
    }
}

fn setup() -> (DailyCrawlWorker, Arc<CrawlStateRepositoryImpl>) {
    let offset = offset_from_hours(8);
    let store = Arc::new(MemoryStore::new());
    let articles = Arc::new(ArticleRepositoryImpl::new(store.clone(), 172_800, offset));
    let tasks = Arc::new(CrawlTaskRepositoryImpl::new(store.clone(), 604_800, 100));
    let state = Arc::new(CrawlStateRepositoryImpl::new(store, 7200, 172_800));
    let settings = Settings::defaults().unwrap().crawler;

    let orchestrator = Arc::new(CrawlOrchestrator::new(
        articles.clone(),
        tasks,
        state.clone(),
        Arc::new(NoLinks),
        Arc::new(NoArticles),
        settings.clone(),
        offset,
    ));
    let worker = DailyCrawlWorker::new(orchestrator, articles, &settings, offset);
    (worker, state)
}

fn today_at(hour: u32) -> DateTime<FixedOffset> {
    now_in(offset_from_hours(8)).with_hour(hour).unwrap()
}

#[tokio::test]
async fn test_tick_before_schedule_only_cleans_up() {
    let (worker, state) = setup();
    let now = today_at(5);
    let yesterday = now.date_naive().pred_opt().unwrap();
    state.try_acquire_lock(yesterday, "crashed").await.unwrap();
    state
        .set_status(yesterday, DailyCrawlStatus::Running)
        .await
        .unwrap();

    assert_eq!(worker.tick(now).await.unwrap(), None);

    assert!(!state.is_locked(yesterday).await.unwrap());
    assert_eq!(state.get_status(yesterday).await.unwrap(), None);
    assert!(!state.is_locked(now.date_naive()).await.unwrap());
}

#[tokio::test]
async fn test_tick_after_schedule_starts_crawl() {
    let (worker, _state) = setup();

    let outcome = worker.tick(today_at(7)).await.unwrap();
    assert!(matches!(outcome, Some(DailyCrawlOutcome::Started(_))));
    assert_eq!(worker.name(), "daily_crawl");
}
