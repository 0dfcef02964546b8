use crate::cache::Cache;
use crate::core::CredentialSource;
use chrono::{DateTime, Utc};
use http::Extensions;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use yup_oauth2::authenticator::{ApplicationDefaultCredentialsTypes, Authenticator};
use yup_oauth2::{ApplicationDefaultCredentialsAuthenticator, ApplicationDefaultCredentialsFlowOpts, ServiceAccountAuthenticator};

type AuthType = Authenticator<HttpsConnector<HttpConnector>>;

pub(crate) const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/firebase",
];

// Tokens this close to expiry are not served from the cache.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Adds a bearer token to every request, consulting the auth-token cache first when one is
/// attached.
#[derive(Clone)]
pub struct AuthMiddleware {
    inner: Arc<Inner>,
}

struct Inner {
    source: CredentialSource,
    token_cache: Option<Cache>,
    cache_key: String,
    authenticator: OnceCell<AuthType>,
}

impl AuthMiddleware {
    pub fn new(source: CredentialSource, token_cache: Option<Cache>) -> Self {
        let cache_key = token_cache_key(&source);
        Self {
            inner: Arc::new(Inner {
                source,
                token_cache,
                cache_key,
                authenticator: OnceCell::new(),
            }),
        }
    }

    pub fn source(&self) -> &CredentialSource {
        &self.inner.source
    }

    pub fn token_cache(&self) -> Option<&Cache> {
        self.inner.token_cache.as_ref()
    }

    async fn authenticator(&self) -> Result<&AuthType, std::io::Error> {
        self.inner
            .authenticator
            .get_or_try_init(|| async {
                match &self.inner.source {
                    CredentialSource::ServiceAccount(key) => ServiceAccountAuthenticator::builder(key.clone()).build().await,
                    CredentialSource::ApplicationDefault => {
                        let opts = ApplicationDefaultCredentialsFlowOpts::default();
                        match ApplicationDefaultCredentialsAuthenticator::builder(opts).await {
                            ApplicationDefaultCredentialsTypes::InstanceMetadata(builder) => builder.build().await,
                            ApplicationDefaultCredentialsTypes::ServiceAccount(builder) => builder.build().await,
                        }
                    }
                }
            })
            .await
    }

    fn cached_token(&self) -> Option<String> {
        let cache = self.inner.token_cache.as_ref()?;
        let raw = match cache.get(&self.inner.cache_key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "auth token cache lookup failed");
                return None;
            }
        };

        let cached: CachedToken = serde_json::from_str(&raw).ok()?;
        let usable_until = cached
            .expires_at
            .checked_sub_signed(chrono::Duration::seconds(EXPIRY_MARGIN_SECS))?;
        if usable_until > Utc::now() {
            Some(cached.token)
        } else {
            None
        }
    }

    fn store_token(&self, token: &str, expires_at: Option<DateTime<Utc>>) {
        let (Some(cache), Some(expires_at)) = (&self.inner.token_cache, expires_at) else {
            return;
        };
        let Ok(ttl) = (expires_at - Utc::now()).to_std() else {
            return;
        };

        let cached = CachedToken {
            token: token.to_string(),
            expires_at,
        };
        let result = serde_json::to_string(&cached)
            .map_err(|e| e.to_string())
            .and_then(|value| {
                cache
                    .set(&self.inner.cache_key, value, Some(ttl))
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            warn!(error = %e, "auth token cache write failed");
        }
    }

    async fn get_token(&self) -> Result<String, anyhow::Error> {
        if let Some(token) = self.cached_token() {
            debug!("using cached auth token");
            return Ok(token);
        }

        let token = self.authenticator().await?.token(SCOPES).await?;
        let value = token.token().ok_or_else(|| anyhow::anyhow!("No token found"))?.to_string();
        let expires_at = token
            .expiration_time()
            .and_then(|at| DateTime::<Utc>::from_timestamp(at.unix_timestamp(), 0));

        self.store_token(&value, expires_at);

        Ok(value)
    }
}

fn token_cache_key(source: &CredentialSource) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.identity().as_bytes());
    for scope in SCOPES {
        hasher.update(b" ");
        hasher.update(scope.as_bytes());
    }
    format!("firebase_auth_token_{}", hex::encode(hasher.finalize()))
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let token = self.get_token().await.map_err(|e| {
            reqwest_middleware::Error::Middleware(anyhow::anyhow!("Failed to get auth token: {}", e))
        })?;

        let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| reqwest_middleware::Error::Middleware(anyhow::anyhow!("Invalid auth token: {}", e)))?;
        req.headers_mut().insert(header::AUTHORIZATION, value);

        next.run(req, extensions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::{BrokenCache, MemoryCache};
    use httpmock::prelude::*;
    use reqwest::Client;
    use reqwest_middleware::ClientBuilder;

    fn cached(token: &str, expires_in: i64) -> String {
        serde_json::to_string(&CachedToken {
            token: token.to_string(),
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_cached_token_is_sent() {
        let backend = MemoryCache::default();
        let key = token_cache_key(&CredentialSource::ApplicationDefault);
        backend.entries.lock().unwrap().insert(key, cached("cached-token", 600));

        let middleware = AuthMiddleware::new(CredentialSource::ApplicationDefault, Some(Cache::simple(backend)));

        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/ping")
                .header("authorization", "Bearer cached-token");
            then.status(200);
        });

        let client = ClientBuilder::new(Client::new()).with(middleware).build();
        let response = client.get(server.url("/ping")).send().await.unwrap();

        assert!(response.status().is_success());
        mock.assert();
    }

    #[test]
    fn test_expiring_tokens_are_not_served() {
        let backend = MemoryCache::default();
        let key = token_cache_key(&CredentialSource::ApplicationDefault);
        backend.entries.lock().unwrap().insert(key, cached("stale", 30));

        let middleware = AuthMiddleware::new(CredentialSource::ApplicationDefault, Some(Cache::simple(backend)));
        assert_eq!(middleware.cached_token(), None);
    }

    #[test]
    fn test_store_token_writes_to_cache() {
        let middleware = AuthMiddleware::new(CredentialSource::ApplicationDefault, Some(Cache::simple(MemoryCache::default())));
        middleware.store_token("fresh", Some(Utc::now() + chrono::Duration::seconds(1800)));

        assert_eq!(middleware.cached_token().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_broken_cache_is_ignored() {
        let middleware = AuthMiddleware::new(CredentialSource::ApplicationDefault, Some(Cache::simple(BrokenCache)));

        middleware.store_token("fresh", Some(Utc::now() + chrono::Duration::seconds(1800)));
        assert_eq!(middleware.cached_token(), None);
    }

    #[test]
    fn test_cache_keys_differ_per_identity() {
        let a = token_cache_key(&CredentialSource::ApplicationDefault);
        let b = token_cache_key(&CredentialSource::ServiceAccount(crate::testing::service_account_key("b")));

        assert_ne!(a, b);
        assert!(a.starts_with("firebase_auth_token_"));
    }
}
