//! Firebase Authentication client.
//!
//! The client is scoped to a project and, when the project configures a `tenant_id`, to a tenant.
//! ID tokens are verified against Google's public keys, which are kept in the project's verifier
//! cache when one is attached.

pub mod keys;
pub mod verifier;

use crate::cache::Cache;
use crate::core::ProjectContext;
use keys::PublicKeyManager;
use reqwest_middleware::ClientWithMiddleware;
use verifier::{FirebaseTokenClaims, IdTokenVerifier, TokenVerificationError};

#[cfg(test)]
mod tests;

const IDENTITY_TOOLKIT_V1_API: &str = "https://identitytoolkit.googleapis.com/v1/projects/{project_id}";

pub struct FirebaseAuth {
    client: ClientWithMiddleware,
    project_id: String,
    tenant_id: Option<String>,
    base_url: String,
    verifier: IdTokenVerifier,
}

impl FirebaseAuth {
    pub fn new(context: ProjectContext, verifier_cache: Option<Cache>) -> Self {
        Self::with_key_manager(context, PublicKeyManager::new(verifier_cache))
    }

    pub(crate) fn with_key_manager(context: ProjectContext, key_manager: PublicKeyManager) -> Self {
        let mut base_url = IDENTITY_TOOLKIT_V1_API.replace("{project_id}", &context.project_id);
        if let Some(tenant_id) = &context.tenant_id {
            base_url = format!("{}/tenants/{}", base_url, tenant_id);
        }

        let verifier = IdTokenVerifier::new(context.project_id.clone(), context.tenant_id.clone(), key_manager);

        Self {
            client: context.client,
            project_id: context.project_id,
            tenant_id: context.tenant_id,
            base_url,
            verifier,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// Identity Toolkit endpoint for this project (or tenant).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http_client(&self) -> &ClientWithMiddleware {
        &self.client
    }

    pub fn verifier_cache(&self) -> Option<&Cache> {
        self.verifier.key_manager().verifier_cache()
    }

    /// Verifies a Firebase ID token and returns its claims.
    pub async fn verify_id_token(&self, token: &str) -> Result<FirebaseTokenClaims, TokenVerificationError> {
        self.verifier.verify_token(token).await
    }
}
