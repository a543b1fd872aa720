// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::{bail, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

use super::kv_store::KeyValueStore;

#[derive(Clone, Debug)]
enum Value {
    Str(String),
    Set(BTreeSet<String>),
    List(VecDeque<String>),
}

#[derive(Clone, Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// 进程内键值存储
///
/// 基于 `DashMap`，过期时间使用 tokio 时钟，暂停时钟的测试中可以直接推进时间。
/// 用于测试和 `memory://` 单进程部署。
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 惰性清除已过期的键
    fn purge_if_expired(&self, key: &str) {
        let now = Instant::now();
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }

    fn deadline(ttl_secs: u64) -> Option<Instant> {
        Some(Instant::now() + Duration::from_secs(ttl_secs))
    }
}

/// 将 Redis 风格的负数下标转换为闭区间，区间为空时返回 None
fn normalize_range(start: isize, stop: isize, len: usize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let escaped = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Ok(Regex::new(&format!("^{}$", escaped))?)
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.purge_if_expired(key);
        match self.entries.get(key).map(|e| e.value.clone()) {
            None => Ok(None),
            Some(Value::Str(value)) => Ok(Some(value)),
            Some(_) => bail!("WRONGTYPE key {} does not hold a string", key),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Self::deadline(ttl_secs),
            },
        );
        Ok(())
    }

    async fn set_keep_ttl(&self, key: &str, value: &str) -> Result<()> {
        self.purge_if_expired(key);
        let expires_at = self.entries.get(key).and_then(|e| e.expires_at);
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at,
            },
        );
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        let fresh = Entry {
            value: Value::Str(value.to_string()),
            expires_at: Self::deadline(ttl_secs),
        };
        // entry() 持有分片写锁，过期检查与写入不会被其他调用者打断
        match self.entries.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                if slot.get().is_expired(Instant::now()) {
                    slot.insert(fresh);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(fresh);
                Ok(true)
            }
        }
    }

    async fn del_if_eq(&self, key: &str, value: &str) -> Result<bool> {
        let now = Instant::now();
        let removed = self.entries.remove_if(key, |_, entry| {
            !entry.is_expired(now) && matches!(&entry.value, Value::Str(current) if current == value)
        });
        self.purge_if_expired(key);
        Ok(removed.is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.purge_if_expired(key);
        Ok(self.entries.contains_key(key))
    }

    async fn del(&self, key: &str) -> Result<bool> {
        self.purge_if_expired(key);
        Ok(self.entries.remove(key).is_some())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        self.purge_if_expired(key);
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Self::deadline(ttl_secs);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        self.purge_if_expired(key);
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Set(BTreeSet::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Set(set) => {
                set.insert(member.to_string());
                Ok(())
            }
            _ => bail!("WRONGTYPE key {} does not hold a set", key),
        }
    }

    async fn srem(&self, key: &str, member: &str) -> Result<()> {
        self.purge_if_expired(key);
        let now_empty = match self.entries.get_mut(key) {
            Some(mut entry) => match &mut entry.value {
                Value::Set(set) => {
                    set.remove(member);
                    set.is_empty()
                }
                _ => bail!("WRONGTYPE key {} does not hold a set", key),
            },
            None => false,
        };
        // Redis 会删除空集合
        if now_empty {
            self.entries.remove(key);
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        self.purge_if_expired(key);
        match self.entries.get(key).map(|e| e.value.clone()) {
            None => Ok(Vec::new()),
            Some(Value::Set(set)) => Ok(set.into_iter().collect()),
            Some(_) => bail!("WRONGTYPE key {} does not hold a set", key),
        }
    }

    async fn scard(&self, key: &str) -> Result<usize> {
        Ok(self.smembers(key).await?.len())
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        self.purge_if_expired(key);
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::List(VecDeque::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::List(list) => {
                list.push_front(value.to_string());
                Ok(())
            }
            _ => bail!("WRONGTYPE key {} does not hold a list", key),
        }
    }

    async fn ltrim(&self, key: &str, start: isize, stop: isize) -> Result<()> {
        self.purge_if_expired(key);
        let now_empty = match self.entries.get_mut(key) {
            Some(mut entry) => match &mut entry.value {
                Value::List(list) => {
                    match normalize_range(start, stop, list.len()) {
                        Some((from, to)) => {
                            list.truncate(to + 1);
                            list.drain(..from);
                        }
                        None => list.clear(),
                    }
                    list.is_empty()
                }
                _ => bail!("WRONGTYPE key {} does not hold a list", key),
            },
            None => false,
        };
        if now_empty {
            self.entries.remove(key);
        }
        Ok(())
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        self.purge_if_expired(key);
        match self.entries.get(key).map(|e| e.value.clone()) {
            None => Ok(Vec::new()),
            Some(Value::List(list)) => Ok(match normalize_range(start, stop, list.len()) {
                Some((from, to)) => list.range(from..=to).cloned().collect(),
                None => Vec::new(),
            }),
            Some(_) => bail!("WRONGTYPE key {} does not hold a list", key),
        }
    }

    async fn llen(&self, key: &str) -> Result<usize> {
        self.purge_if_expired(key);
        match self.entries.get(key).map(|e| e.value.clone()) {
            None => Ok(0),
            Some(Value::List(list)) => Ok(list.len()),
            Some(_) => bail!("WRONGTYPE key {} does not hold a list", key),
        }
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = glob_to_regex(pattern)?;
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| matcher.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
#[path = "memory_store_test.rs"]
mod tests;
