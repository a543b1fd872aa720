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

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    domain::{
        models::article::{ArticleFilter, ArticleStatus, ArticleSummary},
        repositories::{
            article_repository::ArticleRepository, crawl_task_repository::CrawlTaskRepository,
        },
        services::{
            crawl_orchestrator::{CrawlOrchestrator, DailyCrawlOutcome},
            image_cache_service::ImageCacheService,
            markdown::render_document,
        },
    },
    presentation::errors::AppError,
    utils::time::day_key,
};

const DEFAULT_LIST_LIMIT: usize = 50;
const STATS_RECENT_TASKS: usize = 5;

/// 文章列表查询参数
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ArticleQuery {
    /// 关键字，搜索标题和正文
    #[validate(length(min = 1, max = 100, message = "Keyword must be 1-100 characters"))]
    pub q: Option<String>,
    pub category: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    pub status: Option<String>,
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<usize>,
}

fn parse_day(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("Invalid date: {}", raw)))
}

fn format_time(time: Option<DateTime<FixedOffset>>) -> Option<String> {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// 获取当日文章ID列表
///
/// 已有结果直接返回；否则尝试启动爬取并提示稍后再来
pub async fn get_daily_articles(
    Extension(orchestrator): Extension<Arc<CrawlOrchestrator>>,
    Extension(articles): Extension<Arc<dyn ArticleRepository>>,
) -> Result<Response, AppError> {
    match articles.clear_old(1).await {
        Ok(0) => {}
        Ok(deleted) => info!(deleted, "cleared articles from previous days"),
        Err(e) => warn!("Failed to clear old articles: {}", e),
    }

    let crawl_date = day_key(orchestrator.today());
    match orchestrator.clone().start_daily_crawl().await? {
        DailyCrawlOutcome::AlreadyCrawled(ids) => Ok(Json(json!({
            "msg": "success",
            "crawl_date": crawl_date,
            "total_articles": ids.len(),
            "article_ids": ids,
            "status": "cached",
        }))
        .into_response()),
        DailyCrawlOutcome::Started(task) => Ok((
            StatusCode::ACCEPTED,
            Json(json!({
                "msg": "crawling_started",
                "crawl_date": crawl_date,
                "task_id": task.id,
                "status": "crawling",
                "message": "爬取任务已启动，请稍后再次请求获取结果",
            })),
        )
            .into_response()),
        DailyCrawlOutcome::InProgress => Err(AppError::in_progress(
            "爬取任务正在进行，请稍后再次请求获取结果",
        )),
    }
}

/// 获取文章的 Markdown 文档
pub async fn get_article_markdown(
    Extension(articles): Extension<Arc<dyn ArticleRepository>>,
    Path(article_id): Path<String>,
) -> Result<Response, AppError> {
    let article = articles
        .get(&article_id)
        .await?
        .ok_or_else(|| AppError::not_found("Article"))?;

    let disposition = format!(
        "inline; filename*=UTF-8''{}.md",
        urlencoding::encode(&article.title)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        render_document(&article),
    )
        .into_response())
}

/// 获取当日爬取状态
pub async fn get_crawl_status(
    Extension(orchestrator): Extension<Arc<CrawlOrchestrator>>,
    Extension(tasks): Extension<Arc<dyn CrawlTaskRepository>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let snapshot = orchestrator.status().await?;
    let total_tasks = tasks.count().await?;

    let body = match snapshot.latest_task {
        Some(task) => json!({
            "msg": "success",
            "date": snapshot.date,
            "task_status": task.status,
            "crawl_status": snapshot.status,
            "locked": snapshot.locked,
            "articles_count": snapshot.article_count,
            "task_id": task.id,
            "total_links": task.total_links,
            "success_count": task.success_count,
            "failed_count": task.failed_count,
            "started_at": format_time(task.started_at),
            "completed_at": format_time(task.completed_at),
            "total_tasks": total_tasks,
        }),
        None => json!({
            "msg": "success",
            "date": snapshot.date,
            "task_status": "not_started",
            "crawl_status": snapshot.status,
            "locked": snapshot.locked,
            "articles_count": snapshot.article_count,
            "total_tasks": total_tasks,
        }),
    };
    Ok(Json(body))
}

/// 列出或搜索文章
///
/// 带 `q` 时在指定日期（默认当天）的文章中搜索，否则按条件过滤
pub async fn list_articles(
    Extension(orchestrator): Extension<Arc<CrawlOrchestrator>>,
    Extension(articles): Extension<Arc<dyn ArticleRepository>>,
    Query(query): Query<ArticleQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    query
        .validate()
        .map_err(|e| AppError::bad_request(format!("Validation error: {}", e)))?;

    let date = query.date.as_deref().map(parse_day).transpose()?;
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            raw.parse::<ArticleStatus>()
                .map_err(|_| AppError::bad_request(format!("Invalid status: {}", raw)))?,
        ),
        None => None,
    };

    let found = match query.q.as_deref() {
        Some(keyword) => {
            let day = date.unwrap_or_else(|| orchestrator.today());
            articles.search(keyword, day).await?
        }
        None => {
            let filter = ArticleFilter {
                category: query.category.clone(),
                date,
                crawl_status: status,
            };
            articles.filter(&filter).await?
        }
    };

    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let summaries: Vec<ArticleSummary> = found.iter().take(limit).map(ArticleSummary::from).collect();
    Ok(Json(json!({
        "total": found.len(),
        "articles": summaries,
    })))
}

/// 爬虫统计
pub async fn get_crawler_stats(
    Extension(orchestrator): Extension<Arc<CrawlOrchestrator>>,
    Extension(tasks): Extension<Arc<dyn CrawlTaskRepository>>,
    Extension(images): Extension<Arc<ImageCacheService>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let snapshot = orchestrator.status().await?;
    let recent = tasks.recent(STATS_RECENT_TASKS).await?;

    Ok(Json(json!({
        "date": snapshot.date,
        "today_articles_count": snapshot.article_count,
        "total_tasks_count": tasks.count().await?,
        "recent_tasks": recent,
        "image_cache": images.get_cache_stats().await?,
    })))
}
