// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{Days, FixedOffset, NaiveDate};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::keys;
use crate::domain::models::article::{Article, ArticleFilter};
use crate::domain::repositories::article_repository::ArticleRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::cache::kv_store::KeyValueStore;
use crate::utils::time::today_in;

/// 文章仓库实现
///
/// 记录存放在 `article:{id}`，索引为 `daily_articles:{day}` 和 `category:{name}` 两个集合，
/// 三者使用相同的过期时间
pub struct ArticleRepositoryImpl {
    store: Arc<dyn KeyValueStore>,
    ttl_secs: u64,
    offset: FixedOffset,
}

impl ArticleRepositoryImpl {
    /// 创建新的文章仓库实例
    ///
    /// # 参数
    ///
    /// * `store` - 键值存储
    /// * `ttl_secs` - 文章及索引的过期时间
    /// * `offset` - 计算日历日使用的时区
    pub fn new(store: Arc<dyn KeyValueStore>, ttl_secs: u64, offset: FixedOffset) -> Self {
        Self {
            store,
            ttl_secs,
            offset,
        }
    }

    async fn load(&self, id: &str) -> Result<Option<Article>, RepositoryError> {
        match self.store.get(&keys::article(id)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn index(&self, set_key: &str, id: &str) -> Result<(), RepositoryError> {
        self.store.sadd(set_key, id).await?;
        self.store.expire(set_key, self.ttl_secs).await?;
        Ok(())
    }

    /// 保留期覆盖的天数
    fn retention_days(&self) -> u64 {
        self.ttl_secs.div_ceil(86_400).max(1)
    }

    /// 解析过滤条件对应的索引成员
    async fn candidate_ids(&self, filter: &ArticleFilter) -> Result<BTreeSet<String>, RepositoryError> {
        if let Some(day) = filter.date {
            return Ok(self
                .store
                .smembers(&keys::daily_articles(day))
                .await?
                .into_iter()
                .collect());
        }
        if let Some(category) = &filter.category {
            return Ok(self
                .store
                .smembers(&keys::category(category))
                .await?
                .into_iter()
                .collect());
        }

        // 无索引条件时合并保留期内每天的索引
        let today = today_in(self.offset);
        let mut ids = BTreeSet::new();
        for back in 0..=self.retention_days() {
            if let Some(day) = today.checked_sub_days(Days::new(back)) {
                ids.extend(self.store.smembers(&keys::daily_articles(day)).await?);
            }
        }
        Ok(ids)
    }

    /// 删除某一天索引中的全部文章以及该索引
    async fn sweep_day(&self, day: NaiveDate) -> Result<usize, RepositoryError> {
        let day_key = keys::daily_articles(day);
        let mut removed = 0;
        for id in self.store.smembers(&day_key).await? {
            if let Some(article) = self.load(&id).await? {
                self.store.srem(&keys::category(&article.category), &id).await?;
            }
            if self.store.del(&keys::article(&id)).await? {
                removed += 1;
            }
        }
        self.store.del(&day_key).await?;
        Ok(removed)
    }
}

#[async_trait]
impl ArticleRepository for ArticleRepositoryImpl {
    async fn save(&self, mut article: Article) -> Result<String, RepositoryError> {
        if article.id.is_empty() {
            article.id = Article::generate_id(article.created_at);
        }
        let id = article.id.clone();

        // 覆盖写入时移除旧记录留下的索引项
        if let Some(previous) = self.load(&id).await? {
            if previous.category != article.category {
                self.store.srem(&keys::category(&previous.category), &id).await?;
            }
            if previous.day() != article.day() {
                self.store.srem(&keys::daily_articles(previous.day()), &id).await?;
            }
        }

        let json = serde_json::to_string(&article)?;
        self.store.set_ex(&keys::article(&id), &json, self.ttl_secs).await?;
        self.index(&keys::daily_articles(article.day()), &id).await?;
        self.index(&keys::category(&article.category), &id).await?;

        debug!(article_id = %id, category = %article.category, "article saved");
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<Article>, RepositoryError> {
        let Some(mut article) = self.load(id).await? else {
            return Ok(None);
        };
        article.view_count += 1;
        // 并发读取可能少计数，但不会延长过期时间
        let json = serde_json::to_string(&article)?;
        self.store.set_keep_ttl(&keys::article(id), &json).await?;
        Ok(Some(article))
    }

    async fn peek(&self, id: &str) -> Result<Option<Article>, RepositoryError> {
        self.load(id).await
    }

    async fn filter(&self, filter: &ArticleFilter) -> Result<Vec<Article>, RepositoryError> {
        let mut articles = Vec::new();
        for id in self.candidate_ids(filter).await? {
            // 索引读取与记录读取之间过期的成员直接跳过
            if let Some(article) = self.load(&id).await? {
                if filter.matches(&article) {
                    articles.push(article);
                }
            }
        }
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(articles)
    }

    async fn count(&self, filter: &ArticleFilter) -> Result<usize, RepositoryError> {
        Ok(self.filter(filter).await?.len())
    }

    async fn search(&self, keyword: &str, day: NaiveDate) -> Result<Vec<Article>, RepositoryError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .filter(&ArticleFilter::for_day(day))
            .await?
            .into_iter()
            .filter(|article| article.matches_keyword(keyword))
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let Some(article) = self.load(id).await? else {
            return Ok(false);
        };
        self.store.srem(&keys::daily_articles(article.day()), id).await?;
        self.store.srem(&keys::category(&article.category), id).await?;
        Ok(self.store.del(&keys::article(id)).await?)
    }

    /// 从截止日起向前清理保留期内的每一天
    async fn clear_old(&self, days_to_keep: u32) -> Result<usize, RepositoryError> {
        let today = today_in(self.offset);
        let Some(cutoff) = today.checked_sub_days(Days::new(days_to_keep as u64)) else {
            return Ok(0);
        };

        let mut removed = 0;
        for back in 0..=self.retention_days() {
            if let Some(day) = cutoff.checked_sub_days(Days::new(back)) {
                removed += self.sweep_day(day).await?;
            }
        }

        if removed > 0 {
            info!(removed, cutoff = %cutoff, "cleared old articles");
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "article_repo_impl_test.rs"]
mod tests;
