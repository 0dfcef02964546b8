use crate::auth::keys::{KeyFetchError, PublicKeyManager};
use chrono::Utc;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Allowed clock skew for `auth_time`.
const AUTH_TIME_LEEWAY_SECS: usize = 300;

#[derive(Error, Debug)]
pub enum TokenVerificationError {
    #[error("Key fetch error: {0}")]
    KeyFetchError(#[from] KeyFetchError),
    #[error("JWT validation error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token belongs to tenant {actual:?}, expected {expected}")]
    TenantMismatch {
        expected: String,
        actual: Option<String>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FirebaseTokenClaims {
    pub aud: String,
    pub iss: String,
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub auth_time: usize,
    pub user_id: String,
    #[serde(flatten)]
    pub claims: serde_json::Map<String, serde_json::Value>,
}

impl FirebaseTokenClaims {
    /// The tenant the token was issued for, if any.
    pub fn tenant(&self) -> Option<&str> {
        self.claims
            .get("firebase")
            .and_then(|firebase| firebase.get("tenant"))
            .and_then(|tenant| tenant.as_str())
    }
}

pub struct IdTokenVerifier {
    project_id: String,
    tenant_id: Option<String>,
    key_manager: PublicKeyManager,
}

impl IdTokenVerifier {
    pub fn new(project_id: String, tenant_id: Option<String>, key_manager: PublicKeyManager) -> Self {
        Self {
            project_id,
            tenant_id,
            key_manager,
        }
    }

    pub fn key_manager(&self) -> &PublicKeyManager {
        &self.key_manager
    }

    pub async fn verify_token(&self, token: &str) -> Result<FirebaseTokenClaims, TokenVerificationError> {
        let header = decode_header(token)?;
        let kid = header
            .kid
            .ok_or_else(|| TokenVerificationError::InvalidToken("Missing kid in header".to_string()))?;

        let public_key_pem = self.key_manager.get_key(&kid).await?;
        let key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);

        let claims = decode::<FirebaseTokenClaims>(token, &key, &validation)?.claims;
        self.check_claims(&claims)?;

        Ok(claims)
    }

    pub(crate) fn check_claims(&self, claims: &FirebaseTokenClaims) -> Result<(), TokenVerificationError> {
        if claims.sub.is_empty() {
            return Err(TokenVerificationError::InvalidToken(
                "Subject (sub) claim must not be empty".to_string(),
            ));
        }

        let now = usize::try_from(Utc::now().timestamp()).unwrap_or_default();
        if claims.auth_time > now + AUTH_TIME_LEEWAY_SECS {
            return Err(TokenVerificationError::InvalidToken("Auth time is in the future".to_string()));
        }

        if let Some(expected) = &self.tenant_id {
            if claims.tenant() != Some(expected.as_str()) {
                return Err(TokenVerificationError::TenantMismatch {
                    expected: expected.clone(),
                    actual: claims.tenant().map(str::to_string),
                });
            }
        }

        Ok(())
    }
}
