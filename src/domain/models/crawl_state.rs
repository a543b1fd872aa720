// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 每日爬取状态标记
///
/// 与锁相互独立，仅用于轮询展示，允许过时
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyCrawlStatus {
    Running,
    Completed,
    Failed,
}

impl fmt::Display for DailyCrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DailyCrawlStatus::Running => write!(f, "running"),
            DailyCrawlStatus::Completed => write!(f, "completed"),
            DailyCrawlStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for DailyCrawlStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(DailyCrawlStatus::Running),
            "completed" => Ok(DailyCrawlStatus::Completed),
            "failed" => Ok(DailyCrawlStatus::Failed),
            _ => Err(()),
        }
    }
}

/// 列表页中发现的候选文章链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    pub title: String,
    /// 绝对地址
    pub url: String,
}

impl LinkCandidate {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}
