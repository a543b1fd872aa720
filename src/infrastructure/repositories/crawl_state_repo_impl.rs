// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use super::keys;
use crate::domain::models::crawl_state::DailyCrawlStatus;
use crate::domain::repositories::crawl_state_repository::CrawlStateRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::cache::kv_store::KeyValueStore;

/// 每日锁与状态仓库实现
///
/// 锁使用带过期时间的原子写入，持有者崩溃后锁会自动失效
pub struct CrawlStateRepositoryImpl {
    store: Arc<dyn KeyValueStore>,
    lock_ttl_secs: u64,
    status_ttl_secs: u64,
}

impl CrawlStateRepositoryImpl {
    pub fn new(store: Arc<dyn KeyValueStore>, lock_ttl_secs: u64, status_ttl_secs: u64) -> Self {
        Self {
            store,
            lock_ttl_secs,
            status_ttl_secs,
        }
    }
}

#[async_trait]
impl CrawlStateRepository for CrawlStateRepositoryImpl {
    async fn try_acquire_lock(&self, day: NaiveDate, owner: &str) -> Result<bool, RepositoryError> {
        Ok(self
            .store
            .set_nx_ex(&keys::crawl_lock(day), owner, self.lock_ttl_secs)
            .await?)
    }

    async fn release_lock(&self, day: NaiveDate, owner: &str) -> Result<bool, RepositoryError> {
        Ok(self.store.del_if_eq(&keys::crawl_lock(day), owner).await?)
    }

    async fn force_release_lock(&self, day: NaiveDate) -> Result<(), RepositoryError> {
        self.store.del(&keys::crawl_lock(day)).await?;
        Ok(())
    }

    async fn is_locked(&self, day: NaiveDate) -> Result<bool, RepositoryError> {
        Ok(self.store.exists(&keys::crawl_lock(day)).await?)
    }

    async fn get_status(&self, day: NaiveDate) -> Result<Option<DailyCrawlStatus>, RepositoryError> {
        Ok(self
            .store
            .get(&keys::crawl_status(day))
            .await?
            .and_then(|raw| raw.parse().ok()))
    }

    async fn set_status(&self, day: NaiveDate, status: DailyCrawlStatus) -> Result<(), RepositoryError> {
        let ttl_secs = match status {
            DailyCrawlStatus::Running => self.lock_ttl_secs,
            DailyCrawlStatus::Completed | DailyCrawlStatus::Failed => self.status_ttl_secs,
        };
        self.store
            .set_ex(&keys::crawl_status(day), &status.to_string(), ttl_secs)
            .await?;
        Ok(())
    }

    async fn clear_status(&self, day: NaiveDate) -> Result<(), RepositoryError> {
        self.store.del(&keys::crawl_status(day)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::memory_store::MemoryStore;
    use std::time::Duration;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_expires_after_ttl() {
        let repo = CrawlStateRepositoryImpl::new(Arc::new(MemoryStore::new()), 7200, 172_800);

        assert!(repo.try_acquire_lock(day(), "a").await.unwrap());
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!repo.try_acquire_lock(day(), "b").await.unwrap());
        assert!(repo.is_locked(day()).await.unwrap());

        tokio::time::advance(Duration::from_secs(7191)).await;
        assert!(!repo.is_locked(day()).await.unwrap());
        assert!(repo.try_acquire_lock(day(), "b").await.unwrap());
    }

    #[tokio::test]
    async fn test_release_allows_reacquire() {
        let repo = CrawlStateRepositoryImpl::new(Arc::new(MemoryStore::new()), 7200, 172_800);
        assert!(repo.try_acquire_lock(day(), "a").await.unwrap());
        assert!(repo.release_lock(day(), "a").await.unwrap());
        assert!(repo.try_acquire_lock(day(), "b").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_holder_cannot_release_successor_lock() {
        let repo = CrawlStateRepositoryImpl::new(Arc::new(MemoryStore::new()), 7200, 172_800);
        assert!(repo.try_acquire_lock(day(), "a").await.unwrap());

        tokio::time::advance(Duration::from_secs(7201)).await;
        assert!(repo.try_acquire_lock(day(), "b").await.unwrap());

        // a 超时后才结束，释放时不能删掉 b 的锁
        assert!(!repo.release_lock(day(), "a").await.unwrap());
        assert!(repo.is_locked(day()).await.unwrap());
        assert!(!repo.try_acquire_lock(day(), "c").await.unwrap());

        repo.force_release_lock(day()).await.unwrap();
        assert!(!repo.is_locked(day()).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_marker_lives_as_long_as_lock() {
        let repo = CrawlStateRepositoryImpl::new(Arc::new(MemoryStore::new()), 7200, 172_800);

        repo.set_status(day(), DailyCrawlStatus::Running).await.unwrap();
        tokio::time::advance(Duration::from_secs(7201)).await;
        assert_eq!(repo.get_status(day()).await.unwrap(), None);

        repo.set_status(day(), DailyCrawlStatus::Completed).await.unwrap();
        tokio::time::advance(Duration::from_secs(7201)).await;
        assert_eq!(
            repo.get_status(day()).await.unwrap(),
            Some(DailyCrawlStatus::Completed)
        );
    }

    #[tokio::test]
    async fn test_status_round_trip() {
        let repo = CrawlStateRepositoryImpl::new(Arc::new(MemoryStore::new()), 7200, 172_800);
        assert_eq!(repo.get_status(day()).await.unwrap(), None);

        repo.set_status(day(), DailyCrawlStatus::Running).await.unwrap();
        assert_eq!(
            repo.get_status(day()).await.unwrap(),
            Some(DailyCrawlStatus::Running)
        );

        repo.clear_status(day()).await.unwrap();
        assert_eq!(repo.get_status(day()).await.unwrap(), None);
    }
}
