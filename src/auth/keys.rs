use crate::cache::Cache;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub(crate) const GOOGLE_PUBLIC_KEYS_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

const DEFAULT_MAX_AGE_SECS: u64 = 3600;

#[derive(Error, Debug)]
pub enum KeyFetchError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Failed to parse keys")]
    ParseError,
}

#[derive(Clone, Serialize, Deserialize)]
struct CachedKeys {
    keys: HashMap<String, String>,
    expires_at: DateTime<Utc>,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// Google's token signing certificates, kept in the verifier cache when one is attached and in
/// process memory otherwise.
pub struct PublicKeyManager {
    client: Client,
    url: String,
    verifier_cache: Option<Cache>,
    local: Arc<RwLock<Option<CachedKeys>>>,
}

impl PublicKeyManager {
    pub fn new(verifier_cache: Option<Cache>) -> Self {
        Self::with_url(GOOGLE_PUBLIC_KEYS_URL, verifier_cache)
    }

    pub(crate) fn with_url(url: impl Into<String>, verifier_cache: Option<Cache>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            verifier_cache,
            local: Arc::new(RwLock::new(None)),
        }
    }

    pub fn verifier_cache(&self) -> Option<&Cache> {
        self.verifier_cache.as_ref()
    }

    pub async fn get_key(&self, kid: &str) -> Result<String, KeyFetchError> {
        {
            let local = self.local.read().await;
            if let Some(cached) = local.as_ref().filter(|cached| cached.is_fresh()) {
                if let Some(key) = cached.keys.get(kid) {
                    return Ok(key.clone());
                }
            }
        }

        if let Some(cached) = self.load_shared() {
            if let Some(key) = cached.keys.get(kid).cloned() {
                *self.local.write().await = Some(cached);
                return Ok(key);
            }
        }

        let cached = self.refresh_keys().await?;
        cached.keys.get(kid).cloned().ok_or(KeyFetchError::ParseError)
    }

    fn cache_key(&self) -> String {
        format!("firebase_public_keys_{}", hex::encode(Sha256::digest(self.url.as_bytes())))
    }

    fn load_shared(&self) -> Option<CachedKeys> {
        let cache = self.verifier_cache.as_ref()?;
        match cache.get(&self.cache_key()) {
            Ok(Some(raw)) => serde_json::from_str::<CachedKeys>(&raw)
                .ok()
                .filter(CachedKeys::is_fresh),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "verifier cache lookup failed");
                None
            }
        }
    }

    fn store_shared(&self, cached: &CachedKeys, max_age: Duration) {
        let Some(cache) = &self.verifier_cache else {
            return;
        };
        let stored = serde_json::to_string(cached)
            .map_err(|e| e.to_string())
            .and_then(|value| cache.set(&self.cache_key(), value, Some(max_age)).map_err(|e| e.to_string()));
        if let Err(e) = stored {
            warn!(error = %e, "verifier cache write failed");
        }
    }

    async fn refresh_keys(&self) -> Result<CachedKeys, KeyFetchError> {
        debug!(url = %self.url, "fetching public keys");
        let response = self.client.get(&self.url).send().await?.error_for_status()?;

        let max_age = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| {
                s.split(',').find_map(|part| {
                    part.trim()
                        .strip_prefix("max-age=")
                        .and_then(|age| age.parse::<u64>().ok())
                })
            })
            .unwrap_or(DEFAULT_MAX_AGE_SECS);
        let max_age = Duration::from_secs(max_age);

        let keys: HashMap<String, String> = response.json().await?;
        let expires_at = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_add_signed(age))
            .ok_or(KeyFetchError::ParseError)?;
        let cached = CachedKeys { keys, expires_at };

        self.store_shared(&cached, max_age);
        *self.local.write().await = Some(cached.clone());

        Ok(cached)
    }
}
