// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{time_derived_id, DomainError};

/// 爬取任务实体
///
/// 每次成功获得当日锁的爬取尝试对应一个任务。任务由编排器独占修改，
/// 进入 Completed 或 Failed 后不再变化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlTask {
    /// 任务ID，由创建时间派生
    pub id: String,
    pub name: String,
    /// 列表页地址
    pub target_url: String,
    pub task_type: CrawlTaskType,
    pub status: CrawlTaskStatus,
    /// 发现的链接数量
    pub total_links: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub created_at: DateTime<FixedOffset>,
    pub started_at: Option<DateTime<FixedOffset>>,
    pub completed_at: Option<DateTime<FixedOffset>>,
    pub error_message: Option<String>,
}

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrawlTaskType {
    #[default]
    DailyNews,
}

/// 任务状态
///
/// Pending → Running → Completed/Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrawlTaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for CrawlTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CrawlTaskStatus::Pending => write!(f, "pending"),
            CrawlTaskStatus::Running => write!(f, "running"),
            CrawlTaskStatus::Completed => write!(f, "completed"),
            CrawlTaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for CrawlTaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CrawlTaskStatus::Pending),
            "running" => Ok(CrawlTaskStatus::Running),
            "completed" => Ok(CrawlTaskStatus::Completed),
            "failed" => Ok(CrawlTaskStatus::Failed),
            _ => Err(()),
        }
    }
}

impl CrawlTask {
    /// 创建一个新的待执行任务
    ///
    /// # 参数
    ///
    /// * `name` - 任务名称
    /// * `target_url` - 列表页地址
    /// * `now` - 创建时间
    pub fn new(name: impl Into<String>, target_url: impl Into<String>, now: DateTime<FixedOffset>) -> Self {
        Self {
            id: time_derived_id("task", now.timestamp_millis()),
            name: name.into(),
            target_url: target_url.into(),
            task_type: CrawlTaskType::DailyNews,
            status: CrawlTaskStatus::Pending,
            total_links: 0,
            success_count: 0,
            failed_count: 0,
            created_at: now,
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    /// 启动任务
    ///
    /// 将任务状态从Pending变更为Running
    pub fn start(mut self, now: DateTime<FixedOffset>) -> Result<Self, DomainError> {
        match self.status {
            CrawlTaskStatus::Pending => {
                self.status = CrawlTaskStatus::Running;
                self.started_at = Some(now);
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 完成任务
    ///
    /// 将任务状态从Running变更为Completed
    pub fn complete(mut self, now: DateTime<FixedOffset>) -> Result<Self, DomainError> {
        match self.status {
            CrawlTaskStatus::Running => {
                self.status = CrawlTaskStatus::Completed;
                self.completed_at = Some(now);
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 标记任务失败
    ///
    /// Pending 和 Running 状态都可以失败
    pub fn fail(
        mut self,
        message: impl Into<String>,
        now: DateTime<FixedOffset>,
    ) -> Result<Self, DomainError> {
        match self.status {
            CrawlTaskStatus::Pending | CrawlTaskStatus::Running => {
                self.status = CrawlTaskStatus::Failed;
                self.error_message = Some(message.into());
                self.completed_at = Some(now);
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed_count += 1;
    }

    /// 已处理的链接数
    pub fn processed(&self) -> usize {
        self.success_count + self.failed_count
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            CrawlTaskStatus::Completed | CrawlTaskStatus::Failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 9, 1, 8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_lifecycle() {
        let task = CrawlTask::new("daily", "http://example.com/list", now());
        assert!(task.id.starts_with("task_"));
        assert_eq!(task.status, CrawlTaskStatus::Pending);

        let task = task.start(now()).unwrap();
        assert_eq!(task.status, CrawlTaskStatus::Running);
        assert!(task.started_at.is_some());

        let task = task.complete(now()).unwrap();
        assert!(task.is_terminal());
        assert_eq!(
            task.clone().complete(now()).unwrap_err(),
            DomainError::InvalidStateTransition
        );
        assert!(task.fail("late", now()).is_err());
    }

    #[test]
    fn test_fail_records_message() {
        let task = CrawlTask::new("daily", "http://example.com/list", now())
            .start(now())
            .unwrap()
            .fail("no links discovered", now())
            .unwrap();
        assert_eq!(task.status, CrawlTaskStatus::Failed);
        assert_eq!(task.error_message.as_deref(), Some("no links discovered"));
    }

    #[test]
    fn test_counters() {
        let mut task = CrawlTask::new("daily", "u", now());
        task.record_success();
        task.record_failure();
        task.record_failure();
        assert_eq!(task.processed(), 3);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            CrawlTaskStatus::Pending,
            CrawlTaskStatus::Running,
            CrawlTaskStatus::Completed,
            CrawlTaskStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<CrawlTaskStatus>(), Ok(status));
        }
    }
}
