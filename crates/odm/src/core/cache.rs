//! Cache collaborator for raw search responses.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::OdmResult;

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// The key was present.
    Hit(Value),
    /// The key was absent or expired.
    Miss,
}

/// How long a cached response stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// Valid for the given number of seconds.
    Seconds(u64),
    /// Valid until the given instant.
    Until(DateTime<Utc>),
    /// Never expires. Handed to the cache as `-1`.
    Forever,
}

impl CacheTtl {
    /// Interprets an integer TTL, treating `-1` as "cache forever".
    ///
    /// Other negative values are clamped to zero seconds.
    pub fn from_seconds(seconds: i64) -> Self {
        if seconds == -1 {
            CacheTtl::Forever
        } else {
            CacheTtl::Seconds(seconds.max(0) as u64)
        }
    }

    /// Returns the TTL in seconds as passed to cache backends; `-1` for forever.
    pub fn as_seconds(&self) -> i64 {
        match self {
            CacheTtl::Seconds(s) => *s as i64,
            CacheTtl::Until(at) => (*at - Utc::now()).num_seconds().max(0),
            CacheTtl::Forever => -1,
        }
    }

    /// Returns the instant at which an entry written now expires.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            CacheTtl::Seconds(s) => Some(now + Duration::seconds(*s as i64)),
            CacheTtl::Until(at) => Some(*at),
            CacheTtl::Forever => None,
        }
    }
}

impl From<i64> for CacheTtl {
    fn from(seconds: i64) -> Self {
        Self::from_seconds(seconds)
    }
}

impl From<std::time::Duration> for CacheTtl {
    fn from(duration: std::time::Duration) -> Self {
        CacheTtl::Seconds(duration.as_secs())
    }
}

impl From<DateTime<Utc>> for CacheTtl {
    fn from(at: DateTime<Utc>) -> Self {
        CacheTtl::Until(at)
    }
}

/// Key-value store for raw search responses.
///
/// A failing `get` is treated by callers exactly like [`CacheLookup::Miss`].
#[async_trait]
pub trait Cache: Debug + Send + Sync {
    /// Looks up a key.
    async fn get(&self, key: &str) -> OdmResult<CacheLookup>;

    /// Stores a value. `ttl` is passed through verbatim, including
    /// [`CacheTtl::Forever`].
    async fn set(&self, key: &str, value: Value, ttl: CacheTtl) -> OdmResult<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

/// In-process cache with per-entry expiry.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries, including expired ones not yet
    /// evicted.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes a key.
    pub fn forget(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Removes all entries.
    pub fn flush(&self) {
        self.entries.write().clear();
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> OdmResult<CacheLookup> {
        let now = Utc::now();
        let entry = self.entries.read().get(key).cloned();

        match entry {
            Some(entry) if entry.expires_at.is_none_or(|at| at > now) => {
                Ok(CacheLookup::Hit(entry.value))
            }
            Some(_) => {
                self.entries.write().remove(key);
                Ok(CacheLookup::Miss)
            }
            None => Ok(CacheLookup::Miss),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: CacheTtl) -> OdmResult<()> {
        let entry = CacheEntry {
            value,
            expires_at: ttl.expires_at(Utc::now()),
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ttl_forever_sentinel() {
        assert_eq!(CacheTtl::from_seconds(-1), CacheTtl::Forever);
        assert_eq!(CacheTtl::Forever.as_seconds(), -1);
        assert_eq!(CacheTtl::from(600_i64).as_seconds(), 600);
        assert_eq!(CacheTtl::from_seconds(-5), CacheTtl::Seconds(0));
    }

    #[test]
    fn test_ttl_from_duration() {
        let ttl = CacheTtl::from(std::time::Duration::from_secs(90));
        assert_eq!(ttl, CacheTtl::Seconds(90));
    }

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k").await.unwrap(), CacheLookup::Miss);

        cache
            .set("k", json!({"hits": {}}), CacheTtl::Forever)
            .await
            .unwrap();
        assert_eq!(
            cache.get("k").await.unwrap(),
            CacheLookup::Hit(json!({"hits": {}}))
        );
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemoryCache::new();
        let past = Utc::now() - Duration::seconds(5);
        cache
            .set("stale", json!(1), CacheTtl::Until(past))
            .await
            .unwrap();

        assert_eq!(cache.get("stale").await.unwrap(), CacheLookup::Miss);
        assert!(cache.is_empty());
    }
}
