pub mod middleware;

use crate::config::{Credentials, ProjectConfig};
use crate::registry::ResolveError;
use reqwest_middleware::ClientWithMiddleware;
use std::path::{Path, PathBuf};
use thiserror::Error;
use yup_oauth2::ServiceAccountKey;


const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
const PROJECT_ENVS: &[&str] = &["GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"];

/// Errors raised while materializing a service. They only affect the binding being resolved.
#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("Unable to read credentials file {path}: {source}")]
    CredentialsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid service account credentials: {0}")]
    InvalidCredentials(#[from] serde_json::Error),
    #[error("Unable to determine the project id: set `project_id` or use credentials that contain one")]
    ProjectIdMissing,
    #[error("Invalid database URI {uri}: {source}")]
    InvalidDatabaseUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Unable to build the HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Service \"{id}\" is not a supported {expected}")]
    UnsupportedCollaborator { id: String, expected: &'static str },
    #[error("Unable to resolve a dependency: {0}")]
    Dependency(#[from] Box<ResolveError>),
}

impl From<ResolveError> for ConstructionError {
    fn from(err: ResolveError) -> Self {
        Self::Dependency(Box::new(err))
    }
}

/// How a project authenticates against Google APIs.
#[derive(Clone)]
pub enum CredentialSource {
    ServiceAccount(ServiceAccountKey),
    /// Discovered at token time (metadata server or gcloud defaults).
    ApplicationDefault,
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceAccount(key) => f
                .debug_struct("ServiceAccount")
                .field("client_email", &key.client_email)
                .field("project_id", &key.project_id)
                .finish(),
            Self::ApplicationDefault => f.write_str("ApplicationDefault"),
        }
    }
}

impl CredentialSource {
    /// Loads the configured credentials, or discovers them when none are configured.
    pub fn resolve(credentials: Option<&Credentials>) -> Result<Self, ConstructionError> {
        let key = match credentials {
            Some(Credentials::Path(path)) => read_key(path)?,
            Some(Credentials::Json(json)) => serde_json::from_str(json)?,
            Some(Credentials::Map(map)) => serde_json::from_value(serde_json::Value::Object(map.clone()))?,
            None => match std::env::var_os(CREDENTIALS_ENV) {
                Some(path) => read_key(Path::new(&path))?,
                None => return Ok(Self::ApplicationDefault),
            },
        };
        Ok(Self::ServiceAccount(key))
    }

    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::ServiceAccount(key) => key.project_id.as_deref(),
            Self::ApplicationDefault => None,
        }
    }

    /// Stable identity of the credentials, used to namespace cached tokens.
    pub fn identity(&self) -> &str {
        match self {
            Self::ServiceAccount(key) => &key.client_email,
            Self::ApplicationDefault => "application_default",
        }
    }
}

fn read_key(path: &Path) -> Result<ServiceAccountKey, ConstructionError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConstructionError::CredentialsUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

/// Picks the project id: explicit override, then the credentials, then the environment.
pub fn resolve_project_id(override_id: Option<&str>, source: &CredentialSource) -> Result<String, ConstructionError> {
    if let Some(id) = override_id.or_else(|| source.project_id()) {
        return Ok(id.to_string());
    }

    PROJECT_ENVS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|id| !id.is_empty())
        .ok_or(ConstructionError::ProjectIdMissing)
}

/// Everything a capability client needs from its project.
#[derive(Clone)]
pub struct ProjectContext {
    pub project_id: String,
    pub tenant_id: Option<String>,
    pub client: ClientWithMiddleware,
}

impl ProjectContext {
    pub fn new(config: &ProjectConfig, source: &CredentialSource, client: ClientWithMiddleware) -> Result<Self, ConstructionError> {
        Ok(Self {
            project_id: resolve_project_id(config.project_id.as_deref(), source)?,
            tenant_id: config.tenant_id.clone(),
            client,
        })
    }
}
