//! Time-boxed key/value store for catalog answers.
//!
//! Keys follow `plugin:<slug>` and `author:<handle>`. Only successful,
//! normalized results are ever written.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::models::PluginRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Plugin(PluginRecord),
    Plugins(Vec<PluginRecord>),
}

pub fn plugin_key(slug: &str) -> String {
    format!("plugin:{}", slug)
}

pub fn author_key(author: &str) -> String {
    format!("author:{}", author)
}

pub trait CacheStore: Send + Sync {
    /// Returns the value if present and not yet expired.
    fn get(&self, key: &str) -> Option<CachedValue>;

    fn set(&self, key: &str, value: CachedValue, ttl: Duration);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    expires_at: Instant,
}

/// In-process store. Entries live until their TTL runs out or the process exits.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<CachedValue> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if entry.expires_at > Instant::now() {
            return Some(entry.value.clone());
        }
        entries.remove(key);
        None
    }

    fn set(&self, key: &str, value: CachedValue, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.lock().insert(key.to_string(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(slug: &str) -> PluginRecord {
        PluginRecord {
            slug: slug.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(plugin_key("akismet"), "plugin:akismet");
        assert_eq!(author_key("automattic"), "author:automattic");
    }

    #[test]
    fn returns_value_within_ttl() {
        let cache = MemoryCache::new();
        cache.set("plugin:a", CachedValue::Plugin(record("a")), Duration::from_secs(60));
        assert_eq!(cache.get("plugin:a"), Some(CachedValue::Plugin(record("a"))));
        assert_eq!(cache.get("plugin:b"), None);
    }

    #[test]
    fn expired_entry_reads_as_absent_and_is_dropped() {
        let cache = MemoryCache::new();
        cache.set("plugin:a", CachedValue::Plugin(record("a")), Duration::ZERO);
        assert_eq!(cache.get("plugin:a"), None);
        assert!(cache.is_empty());
    }
}
