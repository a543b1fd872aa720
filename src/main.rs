// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use newsrs::config::settings::Settings;
use newsrs::domain::repositories::article_repository::ArticleRepository;
use newsrs::domain::repositories::crawl_task_repository::CrawlTaskRepository;
use newsrs::domain::services::article_extractor::ArticleExtractor;
use newsrs::domain::services::crawl_orchestrator::CrawlOrchestrator;
use newsrs::domain::services::image_cache_service::ImageCacheService;
use newsrs::domain::services::link_discovery::LinkDiscovery;
use newsrs::engines::browser_engine::BrowserEngine;
use newsrs::engines::reqwest_engine::ReqwestEngine;
use newsrs::engines::traits::{ListingNavigator, RedirectStubRule, ScraperEngine};
use newsrs::infrastructure::cache;
use newsrs::infrastructure::metrics::init_metrics;
use newsrs::infrastructure::repositories::article_repo_impl::ArticleRepositoryImpl;
use newsrs::infrastructure::repositories::crawl_state_repo_impl::CrawlStateRepositoryImpl;
use newsrs::infrastructure::repositories::task_repo_impl::CrawlTaskRepositoryImpl;
use newsrs::presentation::routes::{self, ApiServices};
use newsrs::utils::telemetry;
use newsrs::utils::time::offset_from_hours;
use newsrs::workers::daily_crawl_worker::DailyCrawlWorker;
use newsrs::workers::Worker;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting newsrs...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    if settings.metrics.enabled {
        init_metrics(&settings.metrics.listen_addr)?;
    }

    let offset = offset_from_hours(settings.crawler.timezone_offset_hours);

    // 3. Connect to the key-value store
    let store = cache::connect(&settings.redis.url).await?;
    info!("Key-value store connected");

    // 4. Repositories
    let articles: Arc<dyn ArticleRepository> = Arc::new(ArticleRepositoryImpl::new(
        store.clone(),
        settings.storage.article_ttl_secs,
        offset,
    ));
    let tasks: Arc<dyn CrawlTaskRepository> = Arc::new(CrawlTaskRepositoryImpl::new(
        store.clone(),
        settings.storage.task_ttl_secs,
        settings.storage.recent_tasks_cap,
    ));
    let state = Arc::new(CrawlStateRepositoryImpl::new(
        store.clone(),
        settings.storage.lock_ttl_secs,
        settings.storage.status_ttl_secs,
    ));

    // 5. Engines
    let stub_rule = RedirectStubRule {
        min_bytes: settings.crawler.min_page_bytes,
        markers: settings.crawler.redirect_markers.clone(),
    };
    let http: Arc<dyn ScraperEngine> = Arc::new(ReqwestEngine::new(
        Duration::from_secs(settings.crawler.request_timeout_secs),
        settings.crawler.max_redirects,
        stub_rule,
    )?);
    let browser = settings
        .browser
        .enabled
        .then(|| Arc::new(BrowserEngine::new(settings.browser.clone())));
    let navigator = browser
        .clone()
        .map(|b| b as Arc<dyn ListingNavigator>);
    let browser_scraper = browser.map(|b| b as Arc<dyn ScraperEngine>);

    // 6. Services
    let images = Arc::new(ImageCacheService::new(
        store.clone(),
        settings.images.clone(),
        &settings.crawler.base_url,
        offset,
    )?);
    let links = Arc::new(LinkDiscovery::new(
        http.clone(),
        navigator,
        settings.crawler.clone(),
        offset,
    ));
    let extractor = Arc::new(ArticleExtractor::new(
        http,
        browser_scraper,
        images.clone(),
        settings.crawler.clone(),
        offset,
    )?);
    let orchestrator = Arc::new(CrawlOrchestrator::new(
        articles.clone(),
        tasks.clone(),
        state,
        links,
        extractor,
        settings.crawler.clone(),
        offset,
    ));

    // 7. Start workers
    DailyCrawlWorker::new(orchestrator.clone(), articles.clone(), &settings.crawler, offset).spawn();

    // 8. Start HTTP server
    let app = routes::app(ApiServices {
        orchestrator,
        articles,
        tasks,
        images,
    });

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
