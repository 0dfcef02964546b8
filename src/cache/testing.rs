use super::{CacheError, CacheItem, CacheItemPool, SimpleCache};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Key/value backend for tests. Records the TTL of every write.
#[derive(Default)]
pub struct MemoryCache {
    pub entries: Mutex<HashMap<String, String>>,
    pub ttls: Mutex<Vec<Option<Duration>>>,
}

impl SimpleCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        self.ttls.lock().unwrap().push(ttl);
        Ok(())
    }
}

/// Item-pool backend for tests.
#[derive(Default)]
pub struct MemoryPool {
    pub items: Mutex<HashMap<String, CacheItem>>,
}

impl CacheItemPool for MemoryPool {
    fn get_item(&self, key: &str) -> Result<CacheItem, CacheError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_else(|| CacheItem::new(key)))
    }

    fn save(&self, item: CacheItem) -> Result<(), CacheError> {
        self.items.lock().unwrap().insert(item.key().to_string(), item);
        Ok(())
    }
}

/// A backend that fails every call.
pub struct BrokenCache;

impl SimpleCache for BrokenCache {
    fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    fn set(&self, _key: &str, _value: String, _ttl: Option<Duration>) -> Result<(), CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }
}
