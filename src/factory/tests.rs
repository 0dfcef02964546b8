use super::*;
use crate::cache::testing::{MemoryCache, MemoryPool};
use crate::cache::{CacheItemPool, SimpleCache};
use crate::config::Credentials;
use crate::registry::Container;
use crate::testing::{project_config, CREDENTIALS_FIXTURE};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_it_can_handle_a_custom_database_uri() {
    let config = ProjectConfig {
        database_uri: Some("https://domain.tld".to_string()),
        ..project_config()
    };

    let database = ProjectFactory::new().create_database(&config).unwrap();
    assert_eq!(database.base_url().as_str(), "https://domain.tld/");
}

#[test]
fn test_it_can_create_every_client() {
    let factory = ProjectFactory::new();
    let config = project_config();

    let database = factory.create_database(&config).unwrap();
    assert_eq!(database.base_url().as_str(), "https://project-default-rtdb.firebaseio.com/");

    let auth = factory.create_auth(&config).unwrap();
    assert_eq!(auth.project_id(), "project");

    let storage = factory.create_storage(&config).unwrap();
    assert_eq!(storage.default_bucket(), "project.appspot.com");
    assert_eq!(
        storage.bucket_url(None),
        "https://storage.googleapis.com/storage/v1/b/project.appspot.com"
    );

    let remote_config = factory.create_remote_config(&config).unwrap();
    assert_eq!(
        remote_config.template_url(),
        "https://firebaseremoteconfig.googleapis.com/v1/projects/project/remoteConfig"
    );

    let messaging = factory.create_messaging(&config).unwrap();
    assert_eq!(messaging.send_url(), "https://fcm.googleapis.com/v1/projects/project/messages:send");
    assert_eq!(messaging.topic_management_url(true), "https://iid.googleapis.com/iid/v1:batchAdd");

    let firestore = factory.create_firestore(&config).unwrap();
    assert_eq!(
        firestore.document_url("users/alice"),
        "https://firestore.googleapis.com/v1/projects/project/databases/(default)/documents/users/alice"
    );

    let app_check = factory.create_app_check(&config).unwrap();
    assert_eq!(app_check.base_url(), "https://firebaseappcheck.googleapis.com/v1/projects/project");
}

#[test]
fn test_it_can_handle_a_credentials_string() {
    let json = std::fs::read_to_string(CREDENTIALS_FIXTURE).unwrap();
    let config = ProjectConfig {
        credentials: Some(Credentials::from_string(&json)),
        ..ProjectConfig::default()
    };

    assert_eq!(ProjectFactory::new().create_auth(&config).unwrap().project_id(), "project");
}

#[test]
fn test_it_can_handle_a_credentials_map() {
    let json = std::fs::read_to_string(CREDENTIALS_FIXTURE).unwrap();
    let map = serde_json::from_str(&json).unwrap();
    let config = ProjectConfig {
        credentials: Some(Credentials::Map(map)),
        ..ProjectConfig::default()
    };

    assert_eq!(ProjectFactory::new().create_auth(&config).unwrap().project_id(), "project");
}

#[test]
fn test_it_can_handle_a_tenant_id() {
    let config = ProjectConfig {
        tenant_id: Some("tenant-id".to_string()),
        ..project_config()
    };

    let auth = ProjectFactory::new().create_auth(&config).unwrap();
    assert_eq!(auth.tenant_id(), Some("tenant-id"));
}

#[test]
fn test_it_can_handle_a_project_id() {
    let config = ProjectConfig {
        project_id: Some("project-b".to_string()),
        ..project_config()
    };

    let auth = ProjectFactory::new().create_auth(&config).unwrap();
    assert_eq!(auth.project_id(), "project-b");
}

#[test]
fn test_it_accepts_a_simple_verifier_cache() {
    let factory = ProjectFactory::new().with_verifier_cache(Cache::simple(MemoryCache::default()));

    let auth = factory.create_auth(&project_config()).unwrap();
    assert!(matches!(auth.verifier_cache(), Some(Cache::Simple(_))));
}

#[test]
fn test_it_accepts_a_pool_verifier_cache() {
    let factory = ProjectFactory::new().with_verifier_cache(Cache::pool(MemoryPool::default()));

    let auth = factory.create_auth(&project_config()).unwrap();
    assert!(matches!(auth.verifier_cache(), Some(Cache::Pool(_))));
}

#[test]
fn test_it_accepts_both_auth_token_cache_shapes() {
    let factory = ProjectFactory::new().with_auth_token_cache(Cache::simple(MemoryCache::default()));
    assert!(factory.create_auth(&project_config()).is_ok());
    assert!(matches!(factory.auth_token_cache(), Some(Cache::Simple(_))));

    let factory = ProjectFactory::new().with_auth_token_cache(Cache::pool(MemoryPool::default()));
    assert!(factory.create_auth(&project_config()).is_ok());
    assert!(matches!(factory.auth_token_cache(), Some(Cache::Pool(_))));
}

#[test]
fn test_it_accepts_http_client_options() {
    let options = HttpClientOptions::default().with_timeout(Duration::from_secs(10));
    let factory = ProjectFactory::new().with_http_client_options(Some(options.clone()));

    assert_eq!(factory.http_client_options(), Some(&options));
    assert!(factory.create_auth(&project_config()).is_ok());
}

#[test]
fn test_it_can_reset_http_client_options() {
    let options = HttpClientOptions::default().with_timeout(Duration::from_secs(10));
    let factory = ProjectFactory::new()
        .with_http_client_options(Some(options))
        .with_http_client_options(None);

    assert_eq!(factory.http_client_options(), None);
    assert!(factory.create_auth(&project_config()).is_ok());
}

#[test]
fn test_invalid_proxy_is_a_construction_error() {
    let options = HttpClientOptions::default().with_proxy("http://[::1");
    let factory = ProjectFactory::new().with_http_client_options(Some(options));

    assert!(matches!(
        factory.create_messaging(&project_config()),
        Err(ConstructionError::HttpClient(_))
    ));
}

#[test]
fn test_unreadable_credentials_are_a_construction_error() {
    let config = ProjectConfig {
        credentials: Some(Credentials::Path("/does/not/exist.json".into())),
        ..ProjectConfig::default()
    };

    assert!(matches!(
        ProjectFactory::new().create_storage(&config),
        Err(ConstructionError::CredentialsUnreadable { .. })
    ));
}

#[test]
fn test_project_factory_config_from_project() {
    let config = ProjectConfig {
        verifier_cache: Some("cache.app".to_string()),
        http_client_options: Some("app.http".to_string()),
        ..project_config()
    };

    assert_eq!(
        ProjectFactoryConfig::from_project(&config),
        ProjectFactoryConfig {
            verifier_cache: Some(Reference::new("cache.app")),
            auth_token_cache: None,
            http_client_options: Some(Reference::new("app.http")),
        }
    );
}

#[test]
fn test_from_config_detects_cache_shapes() {
    let simple: Arc<dyn SimpleCache> = Arc::new(MemoryCache::default());
    let pool: Arc<dyn CacheItemPool> = Arc::new(MemoryPool::default());

    let mut container = Container::new();
    container.set("cache.simple", simple);
    container.set("cache.pool", pool);
    container.set("app.http", HttpClientOptions::default().with_max_retries(0));

    let config = ProjectFactoryConfig {
        verifier_cache: Some(Reference::new("cache.simple")),
        auth_token_cache: Some(Reference::new("cache.pool")),
        http_client_options: Some(Reference::new("app.http")),
    };

    let factory = ProjectFactory::from_config(&config, &container.resolver()).unwrap();
    assert!(matches!(factory.verifier_cache(), Some(Cache::Simple(_))));
    assert!(matches!(factory.auth_token_cache(), Some(Cache::Pool(_))));
    assert_eq!(factory.http_client_options().map(|o| o.max_retries()), Some(0));
}

#[test]
fn test_from_config_rejects_unsupported_collaborators() {
    let mut container = Container::new();
    container.set("not.a.cache", 42u32);

    let config = ProjectFactoryConfig {
        verifier_cache: Some(Reference::new("not.a.cache")),
        ..ProjectFactoryConfig::default()
    };
    let err = ProjectFactory::from_config(&config, &container.resolver()).unwrap_err();
    assert!(matches!(err, ConstructionError::UnsupportedCollaborator { ref id, .. } if id == "not.a.cache"));

    let config = ProjectFactoryConfig {
        http_client_options: Some(Reference::new("not.a.cache")),
        ..ProjectFactoryConfig::default()
    };
    let err = ProjectFactory::from_config(&config, &container.resolver()).unwrap_err();
    assert!(matches!(err, ConstructionError::UnsupportedCollaborator { .. }));
}

#[test]
fn test_from_config_reports_missing_collaborators() {
    let container = Container::new();
    let config = ProjectFactoryConfig {
        auth_token_cache: Some(Reference::new("cache.missing")),
        ..ProjectFactoryConfig::default()
    };

    let err = ProjectFactory::from_config(&config, &container.resolver()).unwrap_err();
    assert!(matches!(err, ConstructionError::Dependency(_)));
}
