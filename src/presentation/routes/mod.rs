// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ImageSettings;
use crate::domain::repositories::article_repository::ArticleRepository;
use crate::domain::repositories::crawl_task_repository::CrawlTaskRepository;
use crate::domain::services::crawl_orchestrator::CrawlOrchestrator;
use crate::domain::services::image_cache_service::ImageCacheService;
use crate::presentation::handlers::{chat_image_handler, image_handler, news_handler};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// 处理器共享的服务
#[derive(Clone)]
pub struct ApiServices {
    pub orchestrator: Arc<CrawlOrchestrator>,
    pub articles: Arc<dyn ArticleRepository>,
    pub tasks: Arc<dyn CrawlTaskRepository>,
    pub images: Arc<ImageCacheService>,
}

/// 创建应用路由
///
/// # 参数
///
/// * `images` - 图片配置，决定上传接口的请求体上限
///
/// # 返回值
///
/// 返回配置好的路由，处理器依赖的服务需通过 Extension 注入
pub fn routes(images: &ImageSettings) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let crawler_routes = Router::new()
        .route("/api/crawler/daily/", get(news_handler::get_daily_articles))
        .route(
            "/api/crawler/article/{id}/",
            get(news_handler::get_article_markdown),
        )
        .route("/api/crawler/status/", get(news_handler::get_crawl_status))
        .route("/api/crawler/image/{id}/", get(image_handler::get_cached_image))
        .route("/api/crawler/articles", get(news_handler::list_articles))
        .route("/api/crawler/stats", get(news_handler::get_crawler_stats));

    let chat_routes = Router::new()
        .route(
            "/api/chat/images",
            post(chat_image_handler::upload_image)
                .layer(DefaultBodyLimit::max(images.upload_body_limit())),
        )
        .route(
            "/api/chat/images/batch",
            post(chat_image_handler::upload_images)
                .layer(DefaultBodyLimit::max(images.batch_body_limit())),
        )
        .route(
            "/api/chat/images/{id}",
            get(chat_image_handler::get_chat_image).delete(chat_image_handler::delete_chat_image),
        );

    Router::new()
        .merge(public_routes)
        .merge(crawler_routes)
        .merge(chat_routes)
}

/// 创建注入了服务的完整应用
pub fn app(services: ApiServices) -> Router {
    let router = routes(services.images.settings());
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(Extension(services.orchestrator))
            .layer(Extension(services.articles))
            .layer(Extension(services.tasks))
            .layer(Extension(services.images)),
    )
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
