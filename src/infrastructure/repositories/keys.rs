// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 键值存储中的键布局

use chrono::NaiveDate;

use crate::utils::time::day_key;

/// 最近任务列表，最新的在最前
pub const TASKS: &str = "tasks";

pub fn article(id: &str) -> String {
    format!("article:{}", id)
}

pub fn daily_articles(day: NaiveDate) -> String {
    format!("daily_articles:{}", day_key(day))
}

pub fn category(name: &str) -> String {
    format!("category:{}", name)
}

pub fn task(id: &str) -> String {
    format!("task:{}", id)
}

pub fn crawl_lock(day: NaiveDate) -> String {
    format!("crawl_lock:{}", day_key(day))
}

pub fn crawl_status(day: NaiveDate) -> String {
    format!("crawl_status:{}", day_key(day))
}

pub fn image(fingerprint: &str) -> String {
    format!("image:{}", fingerprint)
}

pub fn chat_image(fingerprint: &str) -> String {
    format!("chat_image:{}", fingerprint)
}

pub const IMAGE_PATTERN: &str = "image:*";
pub const CHAT_IMAGE_PATTERN: &str = "chat_image:*";
