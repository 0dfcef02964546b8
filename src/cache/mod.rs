//! Cache collaborators.
//!
//! Projects can be given a verifier cache and an auth-token cache. Applications bring their own
//! cache backends in one of two shapes: a key/value store ([`SimpleCache`]) or a pool of cache
//! items ([`CacheItemPool`]). [`Cache`] wraps either shape behind one interface.

use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
pub(crate) mod testing;

const RESERVED_KEY_CHARACTERS: &[char] = &['{', '}', '(', ')', '/', '\\', '@', ':'];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// A key/value cache with optional expiry.
pub trait SimpleCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError>;
}

/// A cache that hands out [`CacheItem`]s and persists them on [`save`](CacheItemPool::save).
pub trait CacheItemPool: Send + Sync {
    /// Always returns an item; a miss is an item without a value.
    fn get_item(&self, key: &str) -> Result<CacheItem, CacheError>;

    fn save(&self, item: CacheItem) -> Result<(), CacheError>;
}

/// An entry of a [`CacheItemPool`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheItem {
    key: String,
    value: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl CacheItem {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            expires_at: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the value unless the item is a miss or has expired.
    pub fn get(&self) -> Option<&str> {
        if self.is_hit() {
            self.value.as_deref()
        } else {
            None
        }
    }

    pub fn is_hit(&self) -> bool {
        match (&self.value, self.expires_at) {
            (None, _) => false,
            (Some(_), Some(expires_at)) => Utc::now() < expires_at,
            (Some(_), None) => true,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn set(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// A TTL too large to represent as a date never expires.
    pub fn expires_after(mut self, ttl: Option<Duration>) -> Self {
        self.expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        self
    }
}

/// Either cache shape, as attached to a project factory.
#[derive(Clone)]
pub enum Cache {
    Simple(Arc<dyn SimpleCache>),
    Pool(Arc<dyn CacheItemPool>),
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(_) => f.write_str("Cache::Simple(..)"),
            Self::Pool(_) => f.write_str("Cache::Pool(..)"),
        }
    }
}

impl From<Arc<dyn SimpleCache>> for Cache {
    fn from(cache: Arc<dyn SimpleCache>) -> Self {
        Self::Simple(cache)
    }
}

impl From<Arc<dyn CacheItemPool>> for Cache {
    fn from(pool: Arc<dyn CacheItemPool>) -> Self {
        Self::Pool(pool)
    }
}

impl Cache {
    pub fn simple(cache: impl SimpleCache + 'static) -> Self {
        Self::Simple(Arc::new(cache))
    }

    pub fn pool(pool: impl CacheItemPool + 'static) -> Self {
        Self::Pool(Arc::new(pool))
    }

    /// Recognizes a registered collaborator as a cache.
    ///
    /// Accepts a [`Cache`], an `Arc<dyn SimpleCache>` or an `Arc<dyn CacheItemPool>`.
    pub fn detect(service: Arc<dyn Any + Send + Sync>) -> Option<Self> {
        if let Some(cache) = service.downcast_ref::<Cache>() {
            return Some(cache.clone());
        }
        if let Some(cache) = service.downcast_ref::<Arc<dyn SimpleCache>>() {
            return Some(Self::Simple(cache.clone()));
        }
        if let Some(pool) = service.downcast_ref::<Arc<dyn CacheItemPool>>() {
            return Some(Self::Pool(pool.clone()));
        }
        None
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        validate_key(key)?;
        match self {
            Self::Simple(cache) => cache.get(key),
            Self::Pool(pool) => Ok(pool.get_item(key)?.get().map(str::to_string)),
        }
    }

    pub fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError> {
        validate_key(key)?;
        match self {
            Self::Simple(cache) => cache.set(key, value, ttl),
            Self::Pool(pool) => {
                let item = pool.get_item(key)?.set(value).expires_after(ttl);
                pool.save(item)
            }
        }
    }
}

fn validate_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty() || key.contains(RESERVED_KEY_CHARACTERS) {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}
