// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use crate::domain::models::article::{ArticleStatus, ImageRef};
use crate::infrastructure::cache::memory_store::MemoryStore;
use crate::utils::time::{now_in, offset_from_hours};
use chrono::{DateTime, Duration};
use std::collections::BTreeMap;

fn offset() -> FixedOffset {
    offset_from_hours(8)
}

fn repo() -> (Arc<MemoryStore>, ArticleRepositoryImpl) {
    let store = Arc::new(MemoryStore::new());
    let repo = ArticleRepositoryImpl::new(store.clone(), 172_800, offset());
    (store, repo)
}

fn article(title: &str, category: &str, created_at: DateTime<FixedOffset>) -> Article {
    Article {
        id: String::new(),
        title: title.to_string(),
        url: format!("http://www.people.com.cn/n1/{}.html", title),
        source: "人民网".to_string(),
        publish_date: created_at,
        raw_content: format!("{} 的正文内容", title),
        rendered_markdown: format!("# {}\n\n正文内容", title),
        summary: String::new(),
        category: category.to_string(),
        word_count: 4,
        image_count: 0,
        image_mapping: BTreeMap::new(),
        crawl_status: ArticleStatus::Success,
        view_count: 0,
        created_at,
        updated_at: created_at,
    }
}

#[tokio::test]
async fn test_save_assigns_id_and_indexes() {
    let (store, repo) = repo();
    let now = now_in(offset());
    let id = repo.save(article("alpha", "国际", now)).await.unwrap();

    assert!(id.starts_with("article_"));
    let today = now.date_naive();
    assert_eq!(
        store.smembers(&keys::daily_articles(today)).await.unwrap(),
        vec![id.clone()]
    );
    assert_eq!(
        store.smembers(&keys::category("国际")).await.unwrap(),
        vec![id.clone()]
    );
    assert_eq!(repo.peek(&id).await.unwrap().unwrap().title, "alpha");
}

#[tokio::test]
async fn test_save_same_id_last_write_wins() {
    let (store, repo) = repo();
    let now = now_in(offset());
    let mut first = article("alpha", "国际", now);
    first.id = "article_fixed".to_string();
    repo.save(first).await.unwrap();

    let mut second = article("beta", "军事", now);
    second.id = "article_fixed".to_string();
    repo.save(second).await.unwrap();

    assert_eq!(repo.peek("article_fixed").await.unwrap().unwrap().title, "beta");
    assert!(store.smembers(&keys::category("国际")).await.unwrap().is_empty());
    assert_eq!(
        store.smembers(&keys::category("军事")).await.unwrap(),
        vec!["article_fixed"]
    );
}

#[tokio::test]
async fn test_get_increments_view_count() {
    let (_, repo) = repo();
    let id = repo.save(article("alpha", "国际", now_in(offset()))).await.unwrap();

    assert_eq!(repo.get(&id).await.unwrap().unwrap().view_count, 1);
    assert_eq!(repo.get(&id).await.unwrap().unwrap().view_count, 2);
    assert_eq!(repo.peek(&id).await.unwrap().unwrap().view_count, 2);
    assert!(repo.get("article_missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_filter_skips_members_without_record() {
    let (store, repo) = repo();
    let now = now_in(offset());
    let id = repo.save(article("alpha", "国际", now)).await.unwrap();
    store
        .sadd(&keys::daily_articles(now.date_naive()), "article_gone")
        .await
        .unwrap();

    let found = repo
        .filter(&ArticleFilter::for_day(now.date_naive()))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);
}

#[tokio::test]
async fn test_filter_by_category_and_status() {
    let (_, repo) = repo();
    let now = now_in(offset());
    repo.save(article("alpha", "国际", now)).await.unwrap();
    repo.save(article("beta", "军事", now)).await.unwrap();
    let mut failed = article("gamma", "国际", now);
    failed.crawl_status = ArticleStatus::Failed;
    repo.save(failed).await.unwrap();

    let international = ArticleFilter::default().with_category("国际");
    assert_eq!(repo.count(&international).await.unwrap(), 2);
    assert_eq!(
        repo.count(&international.with_status(ArticleStatus::Success))
            .await
            .unwrap(),
        1
    );
    assert_eq!(repo.count(&ArticleFilter::default()).await.unwrap(), 3);
}

#[tokio::test]
async fn test_search_matches_title_and_content() {
    let (_, repo) = repo();
    let now = now_in(offset());
    repo.save(article("Economy", "经济·科技", now)).await.unwrap();
    repo.save(article("sports", "文旅·体育", now)).await.unwrap();

    let hits = repo.search("economy", now.date_naive()).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Economy");
    assert!(repo.search("  ", now.date_naive()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_removes_indices() {
    let (store, repo) = repo();
    let now = now_in(offset());
    let id = repo.save(article("alpha", "国际", now)).await.unwrap();

    assert!(repo.delete(&id).await.unwrap());
    assert!(!repo.delete(&id).await.unwrap());
    assert!(store
        .smembers(&keys::daily_articles(now.date_naive()))
        .await
        .unwrap()
        .is_empty());
    assert!(store.smembers(&keys::category("国际")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_old_leaves_no_dangling_index_or_record() {
    let (store, repo) = repo();
    let now = now_in(offset());
    let today_id = repo.save(article("today", "国际", now)).await.unwrap();
    let old_id = repo
        .save(article("old", "国际", now - Duration::days(1)))
        .await
        .unwrap();
    let older_id = repo
        .save(article("older", "军事", now - Duration::days(2)))
        .await
        .unwrap();

    let removed = repo.clear_old(1).await.unwrap();
    assert_eq!(removed, 2);

    for back in 1..=3 {
        let day = now.date_naive() - Duration::days(back);
        assert!(!store.exists(&keys::daily_articles(day)).await.unwrap());
    }
    assert!(repo.peek(&old_id).await.unwrap().is_none());
    assert!(repo.peek(&older_id).await.unwrap().is_none());
    assert_eq!(
        store.smembers(&keys::category("国际")).await.unwrap(),
        vec![today_id.clone()]
    );
    assert!(store.smembers(&keys::category("军事")).await.unwrap().is_empty());
    assert!(repo.peek(&today_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_image_mapping_survives_round_trip() {
    let (_, repo) = repo();
    let mut with_image = article("alpha", "国际", now_in(offset()));
    with_image.image_mapping.insert(
        "http://img.example.com/a.jpg".to_string(),
        ImageRef {
            image_id: "abc".to_string(),
            alt_text: "图片".to_string(),
            content_type: "image/jpeg".to_string(),
        },
    );
    with_image.image_count = 1;
    let id = repo.save(with_image.clone()).await.unwrap();

    let loaded = repo.peek(&id).await.unwrap().unwrap();
    assert_eq!(loaded.image_mapping, with_image.image_mapping);
}
