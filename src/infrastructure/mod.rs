// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，负责与外部系统交互。
///
/// 包含的子模块：
/// - 缓存（cache）：键值存储抽象，Redis 与内存两种实现
/// - 指标（metrics）：Prometheus 指标导出
/// - 仓库实现（repositories）：基于键值存储的领域仓库实现
///
/// 基础设施层遵循依赖倒置原则，依赖于领域层的抽象接口，
/// 确保领域层保持纯粹的业务逻辑，不受技术实现的影响。
pub mod cache;
pub mod metrics;
pub mod repositories;
