// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::FixedOffset;
use image::{DynamicImage, ImageFormat};
use newsrs::config::settings::Settings;
use newsrs::domain::models::article::{Article, ArticleStatus};
use newsrs::domain::models::crawl_state::{DailyCrawlStatus, LinkCandidate};
use newsrs::domain::repositories::article_repository::ArticleRepository;
use newsrs::domain::services::article_extractor::ArticleSource;
use newsrs::domain::services::crawl_orchestrator::CrawlOrchestrator;
use newsrs::domain::services::image_cache_service::ImageCacheService;
use newsrs::domain::services::link_discovery::LinkSource;
use newsrs::infrastructure::cache::memory_store::MemoryStore;
use newsrs::infrastructure::repositories::article_repo_impl::ArticleRepositoryImpl;
use newsrs::infrastructure::repositories::crawl_state_repo_impl::CrawlStateRepositoryImpl;
use newsrs::infrastructure::repositories::task_repo_impl::CrawlTaskRepositoryImpl;
use newsrs::presentation::routes::{self, ApiServices};
use newsrs::utils::time::{now_in, offset_from_hours};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub fn offset() -> FixedOffset {
    offset_from_hours(8)
}

/// 返回固定数量的候选链接
pub struct FixedLinks(pub usize);

#[async_trait]
impl LinkSource for FixedLinks {
    async fn discover(&self) -> Vec<LinkCandidate> {
        (1..=self.0)
            .map(|n| {
                LinkCandidate::new(
                    format!("今日要闻第{}篇报道", n),
                    format!("http://www.people.com.cn/n1/2025/0901/c1001-{}.html", n),
                )
            })
            .collect()
    }
}

/// 每篇文章都要先拿到一个许可，测试借此控制爬取进度
pub struct GatedArticles {
    pub gate: Arc<Semaphore>,
}

#[async_trait]
impl ArticleSource for GatedArticles {
    async fn extract(&self, link: &LinkCandidate) -> Option<Article> {
        let _permit = self.gate.acquire().await.ok()?;
        Some(article(&link.title, &link.url))
    }
}

pub fn article(title: &str, url: &str) -> Article {
    let now = now_in(offset());
    Article {
        id: String::new(),
        title: title.to_string(),
        url: url.to_string(),
        source: "人民网".to_string(),
        publish_date: now,
        raw_content: format!("{}的正文内容，关于经济发展", title),
        rendered_markdown: format!("# {}\n\n{}的正文内容，关于经济发展", title, title),
        summary: format!("{}的正文内容", title),
        category: "经济·科技".to_string(),
        word_count: 12,
        image_count: 0,
        image_mapping: BTreeMap::new(),
        crawl_status: ArticleStatus::Success,
        view_count: 0,
        created_at: now,
        updated_at: now,
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub articles: Arc<ArticleRepositoryImpl>,
    pub orchestrator: Arc<CrawlOrchestrator>,
    pub gate: Arc<Semaphore>,
}

impl TestApp {
    /// 放行所有文章并等待当日爬取结束
    pub async fn finish_crawl(&self) -> Option<DailyCrawlStatus> {
        self.gate.add_permits(1000);
        for _ in 0..200 {
            let snapshot = self.orchestrator.status().await.unwrap();
            if !snapshot.locked && snapshot.status != Some(DailyCrawlStatus::Running) {
                return snapshot.status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }
}

/// 构建完整的应用，链接来源返回 `link_count` 条链接
pub fn create_test_app(link_count: usize) -> TestApp {
    let mut settings = Settings::defaults().unwrap();
    settings.crawler.request_delay_ms = 0;

    let store = Arc::new(MemoryStore::new());
    let articles = Arc::new(ArticleRepositoryImpl::new(
        store.clone(),
        settings.storage.article_ttl_secs,
        offset(),
    ));
    let tasks = Arc::new(CrawlTaskRepositoryImpl::new(
        store.clone(),
        settings.storage.task_ttl_secs,
        settings.storage.recent_tasks_cap,
    ));
    let state = Arc::new(CrawlStateRepositoryImpl::new(
        store.clone(),
        settings.storage.lock_ttl_secs,
        settings.storage.status_ttl_secs,
    ));
    let images = Arc::new(
        ImageCacheService::new(
            store,
            settings.images.clone(),
            &settings.crawler.base_url,
            offset(),
        )
        .unwrap(),
    );

    let gate = Arc::new(Semaphore::new(0));
    let orchestrator = Arc::new(CrawlOrchestrator::new(
        articles.clone(),
        tasks.clone(),
        state,
        Arc::new(FixedLinks(link_count)),
        Arc::new(GatedArticles { gate: gate.clone() }),
        settings.crawler.clone(),
        offset(),
    ));

    let app = routes::app(ApiServices {
        orchestrator: orchestrator.clone(),
        articles: articles.clone() as Arc<dyn ArticleRepository>,
        tasks,
        images,
    });

    TestApp {
        server: TestServer::new(app).unwrap(),
        articles,
        orchestrator,
        gate,
    }
}
