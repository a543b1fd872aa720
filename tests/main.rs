// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 测试主模块
///
/// 通过 HTTP 接口驱动完整的应用，存储使用进程内实现，链接与文章来源使用替身
mod integration;
