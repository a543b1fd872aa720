// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::time_derived_id;

/// 未能识别分类时使用的默认分类
pub const DEFAULT_CATEGORY: &str = "综合";

/// 文章实体
///
/// 一篇成功提取的新闻。保存时写入按日和按分类两个索引，
/// 过期后记录与索引一同移除。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// 文章ID，为空时由仓库在保存时分配
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub publish_date: DateTime<FixedOffset>,
    /// 纯文本正文
    pub raw_content: String,
    /// 渲染后的 Markdown
    pub rendered_markdown: String,
    /// 由完整句子组成的摘要
    #[serde(default)]
    pub summary: String,
    pub category: String,
    pub word_count: usize,
    pub image_count: usize,
    /// 原始图片地址 → 缓存引用
    pub image_mapping: BTreeMap<String, ImageRef>,
    pub crawl_status: ArticleStatus,
    pub view_count: u64,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

/// 文章中图片的缓存引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub image_id: String,
    pub alt_text: String,
    pub content_type: String,
}

/// 文章爬取状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArticleStatus::Pending => write!(f, "pending"),
            ArticleStatus::Success => write!(f, "success"),
            ArticleStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ArticleStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ArticleStatus::Pending),
            "success" => Ok(ArticleStatus::Success),
            "failed" => Ok(ArticleStatus::Failed),
            _ => Err(()),
        }
    }
}

impl Article {
    /// 根据创建时间生成新的文章ID
    pub fn generate_id(now: DateTime<FixedOffset>) -> String {
        time_derived_id("article", now.timestamp_millis())
    }

    /// 文章所属的日历日（按创建时间所在时区计算）
    pub fn day(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// 成功状态的文章必须有内容和字数
    pub fn is_complete(&self) -> bool {
        self.crawl_status == ArticleStatus::Success
            && !self.rendered_markdown.trim().is_empty()
            && self.word_count > 0
    }

    /// 标题或正文包含关键字（不区分大小写）
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let needle = keyword.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.raw_content.to_lowercase().contains(&needle)
    }
}

/// 文章列表项，不含正文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub publish_date: DateTime<FixedOffset>,
    pub category: String,
    pub summary: String,
    pub word_count: usize,
    pub image_count: usize,
    pub view_count: u64,
    pub crawl_status: ArticleStatus,
}

impl From<&Article> for ArticleSummary {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            url: article.url.clone(),
            source: article.source.clone(),
            publish_date: article.publish_date,
            category: article.category.clone(),
            summary: article.summary.clone(),
            word_count: article.word_count,
            image_count: article.image_count,
            view_count: article.view_count,
            crawl_status: article.crawl_status,
        }
    }
}

/// 文章过滤条件，所有条件为与关系
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub crawl_status: Option<ArticleStatus>,
}

impl ArticleFilter {
    pub fn for_day(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: ArticleStatus) -> Self {
        self.crawl_status = Some(status);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// 对已加载的文章应用剩余条件
    pub fn matches(&self, article: &Article) -> bool {
        self.category.as_ref().map_or(true, |c| &article.category == c)
            && self.date.map_or(true, |d| article.day() == d)
            && self.crawl_status.map_or(true, |s| article.crawl_status == s)
    }
}
