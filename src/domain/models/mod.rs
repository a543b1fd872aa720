// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 文章（article）：一篇成功提取的新闻及其图片映射
/// - 爬取任务（crawl_task）：一次每日爬取的执行记录
/// - 爬取状态（crawl_state）：每日状态标记与候选链接
/// - 图片（image）：内容寻址的图片缓存条目
pub mod article;
pub mod crawl_state;
pub mod crawl_task;
pub mod image;

use thiserror::Error;

/// 领域错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    /// 无效的状态转换
    #[error("Invalid state transition")]
    InvalidStateTransition,
}

/// 生成形如 `{prefix}_{毫秒时间戳}_{随机后缀}` 的ID
pub(crate) fn time_derived_id(prefix: &str, millis: i64) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, millis, &suffix[..8])
}
