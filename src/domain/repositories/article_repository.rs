// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::RepositoryError;
use crate::domain::models::article::{Article, ArticleFilter};

/// 文章仓库特质
///
/// 定义文章数据访问接口
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// 保存文章并写入索引，返回文章ID
    ///
    /// 相同ID的两次保存后写者胜出
    async fn save(&self, article: Article) -> Result<String, RepositoryError>;

    /// 读取文章并增加阅读次数
    async fn get(&self, id: &str) -> Result<Option<Article>, RepositoryError>;

    /// 读取文章，不影响阅读次数
    async fn peek(&self, id: &str) -> Result<Option<Article>, RepositoryError>;

    /// 按条件过滤，索引中已过期的成员会被跳过
    async fn filter(&self, filter: &ArticleFilter) -> Result<Vec<Article>, RepositoryError>;

    async fn count(&self, filter: &ArticleFilter) -> Result<usize, RepositoryError>;

    /// 在指定日期的文章中按关键字搜索标题和正文
    async fn search(&self, keyword: &str, day: NaiveDate) -> Result<Vec<Article>, RepositoryError>;

    /// 删除文章及其索引项
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;

    /// 清理早于保留期的文章，返回删除的文章数
    async fn clear_old(&self, days_to_keep: u32) -> Result<usize, RepositoryError>;
}
