// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含每日新闻爬取的核心业务逻辑：
/// - 链接发现（link_discovery）：HTTP 优先、浏览器兜底的候选链接收集
/// - 文章提取（article_extractor）：正文定位、元数据解析与图片占位替换
/// - 图片缓存（image_cache_service）：按指纹去重、校验并缓存图片
/// - 爬取编排（crawl_orchestrator）：每日锁、逐篇处理与任务进度
/// - Markdown 渲染（markdown）：文章正文与对外文档
pub mod article_extractor;
pub mod crawl_orchestrator;
pub mod image_cache_service;
pub mod link_discovery;
pub mod markdown;
