//! Per-project client factory.
//!
//! A [`ProjectFactory`] holds the collaborators a project shares between its clients: the verifier
//! cache, the auth-token cache and the HTTP client options. It is built once per project from an
//! immutable [`ProjectFactoryConfig`] and never changes afterwards, so clients of one project never
//! see another project's collaborators.

use crate::app_check::FirebaseAppCheck;
use crate::auth::FirebaseAuth;
use crate::cache::Cache;
use crate::config::ProjectConfig;
use crate::core::middleware::AuthMiddleware;
use crate::core::{CredentialSource, ProjectContext};
use crate::database::FirebaseDatabase;
use crate::firestore::FirebaseFirestore;
use crate::http::HttpClientOptions;
use crate::messaging::FirebaseMessaging;
use crate::registry::{Reference, Resolver};
use crate::remote_config::FirebaseRemoteConfig;
use crate::storage::FirebaseStorage;
use tracing::debug;

pub use crate::core::ConstructionError;

#[cfg(test)]
mod tests;

/// The collaborators a project factory is built with, as service references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFactoryConfig {
    pub verifier_cache: Option<Reference>,
    pub auth_token_cache: Option<Reference>,
    pub http_client_options: Option<Reference>,
}

impl ProjectFactoryConfig {
    pub fn from_project(config: &ProjectConfig) -> Self {
        Self {
            verifier_cache: config.verifier_cache.as_deref().map(Reference::new),
            auth_token_cache: config.auth_token_cache.as_deref().map(Reference::new),
            http_client_options: config.http_client_options.as_deref().map(Reference::new),
        }
    }
}

/// Creates the Firebase clients of one project.
#[derive(Debug, Clone, Default)]
pub struct ProjectFactory {
    verifier_cache: Option<Cache>,
    auth_token_cache: Option<Cache>,
    http_client_options: Option<HttpClientOptions>,
}

impl ProjectFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the collaborators referenced by `config`.
    pub fn from_config(config: &ProjectFactoryConfig, resolver: &Resolver<'_>) -> Result<Self, ConstructionError> {
        let mut factory = Self::new();

        if let Some(reference) = &config.verifier_cache {
            factory = factory.with_verifier_cache(resolve_cache(resolver, reference)?);
        }
        if let Some(reference) = &config.auth_token_cache {
            factory = factory.with_auth_token_cache(resolve_cache(resolver, reference)?);
        }
        if let Some(reference) = &config.http_client_options {
            let service = resolver.get_any(reference.id())?;
            let options = service
                .downcast_ref::<HttpClientOptions>()
                .cloned()
                .ok_or_else(|| ConstructionError::UnsupportedCollaborator {
                    id: reference.id().to_string(),
                    expected: "HTTP client options instance",
                })?;
            factory = factory.with_http_client_options(Some(options));
        }

        Ok(factory)
    }

    pub fn with_verifier_cache(mut self, cache: Cache) -> Self {
        self.verifier_cache = Some(cache);
        self
    }

    pub fn with_auth_token_cache(mut self, cache: Cache) -> Self {
        self.auth_token_cache = Some(cache);
        self
    }

    /// `None` restores the default transport settings.
    pub fn with_http_client_options(mut self, options: Option<HttpClientOptions>) -> Self {
        self.http_client_options = options;
        self
    }

    pub fn verifier_cache(&self) -> Option<&Cache> {
        self.verifier_cache.as_ref()
    }

    pub fn auth_token_cache(&self) -> Option<&Cache> {
        self.auth_token_cache.as_ref()
    }

    pub fn http_client_options(&self) -> Option<&HttpClientOptions> {
        self.http_client_options.as_ref()
    }

    pub fn create_database(&self, config: &ProjectConfig) -> Result<FirebaseDatabase, ConstructionError> {
        FirebaseDatabase::new(self.context(config)?, config.database_uri.as_deref())
    }

    pub fn create_auth(&self, config: &ProjectConfig) -> Result<FirebaseAuth, ConstructionError> {
        Ok(FirebaseAuth::new(self.context(config)?, self.verifier_cache.clone()))
    }

    pub fn create_storage(&self, config: &ProjectConfig) -> Result<FirebaseStorage, ConstructionError> {
        Ok(FirebaseStorage::new(self.context(config)?))
    }

    pub fn create_remote_config(&self, config: &ProjectConfig) -> Result<FirebaseRemoteConfig, ConstructionError> {
        Ok(FirebaseRemoteConfig::new(self.context(config)?))
    }

    pub fn create_messaging(&self, config: &ProjectConfig) -> Result<FirebaseMessaging, ConstructionError> {
        Ok(FirebaseMessaging::new(self.context(config)?))
    }

    pub fn create_firestore(&self, config: &ProjectConfig) -> Result<FirebaseFirestore, ConstructionError> {
        Ok(FirebaseFirestore::new(self.context(config)?))
    }

    pub fn create_app_check(&self, config: &ProjectConfig) -> Result<FirebaseAppCheck, ConstructionError> {
        Ok(FirebaseAppCheck::new(self.context(config)?))
    }

    fn context(&self, config: &ProjectConfig) -> Result<ProjectContext, ConstructionError> {
        let source = CredentialSource::resolve(config.credentials.as_ref())?;
        debug!(credentials = ?source, "creating project context");

        let middleware = AuthMiddleware::new(source.clone(), self.auth_token_cache.clone());
        let client = self
            .http_client_options
            .clone()
            .unwrap_or_default()
            .build_client(middleware)?;

        ProjectContext::new(config, &source, client)
    }
}

fn resolve_cache(resolver: &Resolver<'_>, reference: &Reference) -> Result<Cache, ConstructionError> {
    let service = resolver.get_any(reference.id())?;
    Cache::detect(service).ok_or_else(|| ConstructionError::UnsupportedCollaborator {
        id: reference.id().to_string(),
        expected: "cache",
    })
}
