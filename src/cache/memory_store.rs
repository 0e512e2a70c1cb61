use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;

use crate::cache::store::{KvStore, StoreError};
use crate::clock::Clock;

#[derive(Debug, Clone)]
enum Value {
    Counter(i64),
    Text(String),
    /// (score, member)
    Sorted(Vec<(i64, String)>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<i64>,
}

impl Entry {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// 单进程内的键值存储
///
/// 每个键的操作在 DashMap 分片锁内完成，语义与 Redis 单键原子性一致；
/// 过期由注入的时钟决定。
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    fn ttl_deadline(&self, ttl_secs: u64) -> i64 {
        let ttl_ms = i64::try_from(ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        self.clock.now_ms().saturating_add(ttl_ms)
    }

    /// 取出键对应的条目，已过期的条目先删掉
    fn live_entry(&self, key: &str) -> MapEntry<'_, String, Entry> {
        let now = self.clock.now_ms();
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(occupied) if occupied.get().is_expired(now) => {
                let (key, _) = occupied.remove_entry();
                self.entries.entry(key)
            }
            entry => entry,
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        match self.live_entry(key) {
            MapEntry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                Value::Counter(count) => {
                    *count += 1;
                    Ok(*count)
                }
                _ => Err(StoreError::WrongType(key.to_string())),
            },
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: Value::Counter(1),
                    expires_at: None,
                });
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let deadline = self.ttl_deadline(ttl_secs);
        if let MapEntry::Occupied(mut occupied) = self.live_entry(key) {
            occupied.get_mut().expires_at.get_or_insert(deadline);
        }
        Ok(())
    }

    async fn incr_with_expiry(&self, key: &str, ttl_secs: u64) -> Result<i64, StoreError> {
        let deadline = self.ttl_deadline(ttl_secs);
        let mut entry = self.live_entry(key).or_insert_with(|| Entry {
            value: Value::Counter(0),
            expires_at: None,
        });
        let Value::Counter(count) = &mut entry.value else {
            return Err(StoreError::WrongType(key.to_string()));
        };
        *count += 1;
        let current = *count;
        entry.expires_at.get_or_insert(deadline);
        Ok(current)
    }

    async fn record_in_window(
        &self,
        key: &str,
        cutoff: i64,
        score: i64,
        member: &str,
        ttl_secs: u64,
    ) -> Result<u64, StoreError> {
        let deadline = self.ttl_deadline(ttl_secs);
        let mut entry = self.live_entry(key).or_insert_with(|| Entry {
            value: Value::Sorted(Vec::new()),
            expires_at: None,
        });
        let Value::Sorted(members) = &mut entry.value else {
            return Err(StoreError::WrongType(key.to_string()));
        };

        members.retain(|(s, _)| *s > cutoff);
        let count = members.len() as u64;
        match members.iter_mut().find(|(_, m)| m == member) {
            Some(existing) => existing.0 = score,
            None => members.push((score, member.to_string())),
        }
        entry.expires_at = Some(deadline);

        Ok(count)
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<(), StoreError> {
        if let MapEntry::Occupied(mut occupied) = self.live_entry(key) {
            match &mut occupied.get_mut().value {
                Value::Sorted(members) => members.retain(|(_, m)| m != member),
                _ => return Err(StoreError::WrongType(key.to_string())),
            }
        }
        Ok(())
    }

    async fn zcard(&self, key: &str) -> Result<u64, StoreError> {
        match self.live_entry(key) {
            MapEntry::Occupied(occupied) => match &occupied.get().value {
                Value::Sorted(members) => Ok(members.len() as u64),
                _ => Err(StoreError::WrongType(key.to_string())),
            },
            MapEntry::Vacant(_) => Ok(0),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.live_entry(key) {
            MapEntry::Occupied(occupied) => match &occupied.get().value {
                Value::Text(text) => Ok(Some(text.clone())),
                Value::Counter(count) => Ok(Some(count.to_string())),
                Value::Sorted(_) => Err(StoreError::WrongType(key.to_string())),
            },
            MapEntry::Vacant(_) => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: Some(self.ttl_deadline(ttl_secs)),
            },
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
