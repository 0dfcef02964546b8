use super::*;
use crate::cache::testing::MemoryCache;
use super::keys::KeyFetchError;
use httpmock::prelude::*;
use reqwest::Client;
use reqwest_middleware::ClientBuilder;
use serde_json::json;

fn context(tenant_id: Option<&str>) -> ProjectContext {
    ProjectContext {
        project_id: "test-project".to_string(),
        tenant_id: tenant_id.map(str::to_string),
        client: ClientBuilder::new(Client::new()).build(),
    }
}

fn claims(tenant: Option<&str>) -> FirebaseTokenClaims {
    let mut value = json!({
        "aud": "test-project",
        "iss": "https://securetoken.google.com/test-project",
        "sub": "uid",
        "exp": 0,
        "iat": 0,
        "auth_time": 0,
        "user_id": "uid",
    });
    if let Some(tenant) = tenant {
        value["firebase"] = json!({ "tenant": tenant });
    }
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_base_url() {
    let auth = FirebaseAuth::new(context(None), None);
    assert_eq!(auth.base_url(), "https://identitytoolkit.googleapis.com/v1/projects/test-project");
    assert_eq!(auth.tenant_id(), None);
}

#[test]
fn test_tenant_aware_base_url() {
    let auth = FirebaseAuth::new(context(Some("tenant-id")), None);
    assert_eq!(
        auth.base_url(),
        "https://identitytoolkit.googleapis.com/v1/projects/test-project/tenants/tenant-id"
    );
    assert_eq!(auth.tenant_id(), Some("tenant-id"));
}

#[test]
fn test_verifier_cache_is_attached() {
    let auth = FirebaseAuth::new(context(None), Some(Cache::simple(MemoryCache::default())));
    assert!(auth.verifier_cache().is_some());

    let auth = FirebaseAuth::new(context(None), None);
    assert!(auth.verifier_cache().is_none());
}

#[tokio::test]
async fn test_malformed_token_is_rejected() {
    let auth = FirebaseAuth::new(context(None), None);
    let err = auth.verify_id_token("not-a-jwt").await.unwrap_err();
    assert!(matches!(err, TokenVerificationError::JwtError(_)));
}

#[tokio::test]
async fn test_public_keys_are_shared_through_the_verifier_cache() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/keys");
        then.status(200)
            .header("content-type", "application/json")
            .header("cache-control", "public, max-age=600, must-revalidate")
            .json_body(json!({ "kid-1": "pem-1", "kid-2": "pem-2" }));
    });

    let cache = Cache::simple(MemoryCache::default());

    let first = PublicKeyManager::with_url(server.url("/keys"), Some(cache.clone()));
    assert_eq!(first.get_key("kid-1").await.unwrap(), "pem-1");
    assert_eq!(first.get_key("kid-2").await.unwrap(), "pem-2");

    let second = PublicKeyManager::with_url(server.url("/keys"), Some(cache));
    assert_eq!(second.get_key("kid-2").await.unwrap(), "pem-2");

    mock.assert_hits(1);
}

#[tokio::test]
async fn test_public_keys_without_verifier_cache() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/keys");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "kid-1": "pem-1" }));
    });

    let manager = PublicKeyManager::with_url(server.url("/keys"), None);
    assert_eq!(manager.get_key("kid-1").await.unwrap(), "pem-1");
    assert_eq!(manager.get_key("kid-1").await.unwrap(), "pem-1");
    assert!(manager.get_key("unknown").await.is_err());

    // The unknown kid forces one refresh.
    mock.assert_hits(2);
}

#[test]
fn test_tenant_claims() {
    let verifier = IdTokenVerifier::new(
        "test-project".to_string(),
        Some("tenant-a".to_string()),
        PublicKeyManager::new(None),
    );

    assert!(verifier.check_claims(&claims(Some("tenant-a"))).is_ok());
    assert!(matches!(
        verifier.check_claims(&claims(Some("tenant-b"))),
        Err(TokenVerificationError::TenantMismatch { .. })
    ));
    assert!(matches!(
        verifier.check_claims(&claims(None)),
        Err(TokenVerificationError::TenantMismatch { actual: None, .. })
    ));
}

#[test]
fn test_claims_without_tenant_scope() {
    let verifier = IdTokenVerifier::new("test-project".to_string(), None, PublicKeyManager::new(None));
    assert!(verifier.check_claims(&claims(Some("tenant-a"))).is_ok());
}

#[tokio::test]
async fn test_unrepresentable_max_age_is_rejected() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/keys");
        then.status(200)
            .header("content-type", "application/json")
            .header("cache-control", "public, max-age=8796093022208")
            .json_body(json!({ "kid-1": "pem-1" }));
    });

    let manager = PublicKeyManager::with_url(server.url("/keys"), None);
    assert!(matches!(manager.get_key("kid-1").await, Err(KeyFetchError::ParseError)));
}
