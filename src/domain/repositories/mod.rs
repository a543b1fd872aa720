// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，遵循依赖倒置原则。
/// 具体实现由基础设施层基于键值存储提供。
///
/// 包含的仓库接口：
/// - 文章仓库（article_repository）：文章记录及按日、按分类索引
/// - 爬取任务仓库（crawl_task_repository）：任务记录及最近任务列表
/// - 爬取状态仓库（crawl_state_repository）：每日锁与状态标记
pub mod article_repository;
pub mod crawl_state_repository;
pub mod crawl_task_repository;

use thiserror::Error;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 底层存储错误
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}
