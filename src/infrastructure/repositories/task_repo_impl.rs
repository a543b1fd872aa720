// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::sync::Arc;

use super::keys;
use crate::domain::models::crawl_task::CrawlTask;
use crate::domain::repositories::crawl_task_repository::CrawlTaskRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::cache::kv_store::KeyValueStore;

/// 爬取任务仓库实现
pub struct CrawlTaskRepositoryImpl {
    store: Arc<dyn KeyValueStore>,
    ttl_secs: u64,
    /// 最近任务列表的长度上限
    recent_cap: usize,
}

impl CrawlTaskRepositoryImpl {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl_secs: u64, recent_cap: usize) -> Self {
        Self {
            store,
            ttl_secs,
            recent_cap: recent_cap.max(1),
        }
    }

    async fn write(&self, task: &CrawlTask) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(task)?;
        self.store
            .set_ex(&keys::task(&task.id), &json, self.ttl_secs)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CrawlTaskRepository for CrawlTaskRepositoryImpl {
    async fn create(&self, task: &CrawlTask) -> Result<(), RepositoryError> {
        self.write(task).await?;
        self.store.lpush(keys::TASKS, &task.id).await?;
        self.store
            .ltrim(keys::TASKS, 0, self.recent_cap as isize - 1)
            .await?;
        Ok(())
    }

    async fn update(&self, task: &CrawlTask) -> Result<(), RepositoryError> {
        self.write(task).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<CrawlTask>, RepositoryError> {
        match self.store.get(&keys::task(id)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn recent(&self, limit: usize) -> Result<Vec<CrawlTask>, RepositoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let ids = self.store.lrange(keys::TASKS, 0, limit as isize - 1).await?;
        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(task) = self.find_by_id(&id).await? {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.store.llen(keys::TASKS).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::crawl_task::CrawlTaskStatus;
    use crate::infrastructure::cache::memory_store::MemoryStore;
    use crate::utils::time::{now_in, offset_from_hours};

    fn repo(cap: usize) -> CrawlTaskRepositoryImpl {
        CrawlTaskRepositoryImpl::new(Arc::new(MemoryStore::new()), 604_800, cap)
    }

    #[tokio::test]
    async fn test_create_update_and_find() {
        let repo = repo(100);
        let now = now_in(offset_from_hours(8));
        let task = CrawlTask::new("daily", "http://example.com/list", now);
        repo.create(&task).await.unwrap();

        let running = task.clone().start(now).unwrap();
        repo.update(&running).await.unwrap();

        let loaded = repo.find_by_id(&task.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, CrawlTaskStatus::Running);
        assert!(repo.find_by_id("task_missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_capped() {
        let repo = repo(3);
        let now = now_in(offset_from_hours(8));
        let mut ids = Vec::new();
        for i in 0..5 {
            let task = CrawlTask::new(format!("run {}", i), "u", now);
            ids.push(task.id.clone());
            repo.create(&task).await.unwrap();
        }

        assert_eq!(repo.count().await.unwrap(), 3);
        let recent = repo.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, ids[4]);
        assert_eq!(recent[1].id, ids[3]);
        assert!(repo.recent(0).await.unwrap().is_empty());
    }
}
