//! Project configuration schema.
//!
//! The raw configuration is an arbitrary tree (`serde_json::Value`), usually produced by whatever
//! format the host application loads its settings from. [`process`] merges one or more trees,
//! validates them and returns the normalized [`FirebaseConfig`].
//!
//! ```rust
//! # use firebase_projects::config::{self, Credentials};
//! let raw = serde_json::json!({
//!     "projects": {
//!         "app": { "credentials": "/etc/firebase/app.json", "tenant_id": "tenant-1" }
//!     }
//! });
//!
//! let config = config::process(&[raw]).unwrap();
//! let app = &config.projects["app"];
//! assert!(app.public);
//! assert!(matches!(app.credentials, Some(Credentials::Path(_))));
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;


/// Name of the configuration root, used in error paths.
pub const ROOT: &str = "firebase";

const CREDENTIALS_HINT: &str = "Service Account credentials must be provided as a path to the project's credentials file, as a JSON encoded string or as a map";

/// Errors raised while validating the configuration tree. Always fatal to startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Invalid configuration for path \"{path}\": {message}")]
    Invalid { path: String, message: String },
    #[error("Unrecognized option \"{key}\" under \"{path}\"")]
    UnrecognizedOption { path: String, key: String },
    #[error("Only one project can be set as default.")]
    MultipleDefaults,
}

impl ConfigurationError {
    fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The configuration path the error refers to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Invalid { path, .. } | Self::UnrecognizedOption { path, .. } => Some(path),
            Self::MultipleDefaults => None,
        }
    }
}

/// Where a project's service account credentials come from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Credentials {
    /// Path to a service account JSON file.
    Path(PathBuf),
    /// The service account JSON document itself.
    Json(String),
    /// Service account fields given inline.
    Map(Map<String, Value>),
}

impl Credentials {
    /// Interprets a string credential: JSON documents start with `{`, anything else is a path.
    pub fn from_string(value: &str) -> Self {
        if value.trim_start().starts_with('{') {
            Self::Json(value.to_string())
        } else {
            Self::Path(PathBuf::from(value))
        }
    }
}

/// One named entry of the `projects` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectConfig {
    /// Absent means the credentials are discovered from the environment.
    pub credentials: Option<Credentials>,
    /// Overrides the project id found in the credentials.
    pub project_id: Option<String>,
    /// Whether the generated services can be fetched from the container directly.
    pub public: bool,
    /// Marks this project's services as the process-wide defaults.
    pub default: Option<bool>,
    /// Overrides the Realtime Database URL derived from the project id.
    pub database_uri: Option<String>,
    /// Makes the auth client tenant aware.
    pub tenant_id: Option<String>,
    /// Service id of the cache used for Google's public keys.
    pub verifier_cache: Option<String>,
    /// Service id of the cache used for OAuth access tokens.
    pub auth_token_cache: Option<String>,
    /// Service id of an [`HttpClientOptions`](crate::http::HttpClientOptions) instance.
    pub http_client_options: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            project_id: None,
            public: true,
            default: None,
            database_uri: None,
            tenant_id: None,
            verifier_cache: None,
            auth_token_cache: None,
            http_client_options: None,
        }
    }
}

impl ProjectConfig {
    pub fn is_default(&self) -> bool {
        self.default.unwrap_or(false)
    }
}

/// The normalized configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FirebaseConfig {
    pub projects: BTreeMap<String, ProjectConfig>,
}

/// Merges and validates raw configuration trees.
///
/// Projects from later trees are merged into earlier ones by name; options set in a later tree
/// replace the earlier value.
pub fn process(configs: &[Value]) -> Result<FirebaseConfig, ConfigurationError> {
    let mut merged: BTreeMap<String, Map<String, Value>> = BTreeMap::new();

    for config in configs {
        let root = match config {
            Value::Null => continue,
            Value::Object(root) => root,
            other => {
                return Err(ConfigurationError::invalid(
                    ROOT,
                    format!("expected a map, but got {}", type_name(other)),
                ))
            }
        };

        for (key, value) in root {
            if key != "projects" {
                return Err(ConfigurationError::UnrecognizedOption {
                    path: ROOT.to_string(),
                    key: key.clone(),
                });
            }

            let projects = match value {
                Value::Null => continue,
                Value::Object(projects) => projects,
                other => {
                    return Err(ConfigurationError::invalid(
                        format!("{ROOT}.projects"),
                        format!("expected a map, but got {}", type_name(other)),
                    ))
                }
            };

            for (name, entry) in projects {
                let target = merged.entry(name.clone()).or_default();
                match entry {
                    Value::Null => {}
                    Value::Object(options) => {
                        for (option, value) in options {
                            target.insert(option.clone(), value.clone());
                        }
                    }
                    other => {
                        return Err(ConfigurationError::invalid(
                            format!("{ROOT}.projects.{name}"),
                            format!("expected a map, but got {}", type_name(other)),
                        ))
                    }
                }
            }
        }
    }

    let mut projects = BTreeMap::new();
    for (name, options) in merged {
        let project = normalize_project(&name, &options)?;
        projects.insert(name, project);
    }

    Ok(FirebaseConfig { projects })
}

fn normalize_project(name: &str, options: &Map<String, Value>) -> Result<ProjectConfig, ConfigurationError> {
    let base = format!("{ROOT}.projects.{name}");
    let mut project = ProjectConfig::default();

    for (key, value) in options {
        let path = format!("{base}.{key}");
        match key.as_str() {
            "credentials" => project.credentials = credentials(&path, value)?,
            "project_id" => project.project_id = string(&path, value)?,
            "public" => project.public = boolean(&path, value)?.unwrap_or(true),
            "default" => project.default = boolean(&path, value)?,
            "database_uri" => project.database_uri = string(&path, value)?,
            "tenant_id" => project.tenant_id = string(&path, value)?,
            "verifier_cache" => project.verifier_cache = string(&path, value)?,
            "auth_token_cache" => project.auth_token_cache = string(&path, value)?,
            "http_client_options" => project.http_client_options = string(&path, value)?,
            _ => {
                return Err(ConfigurationError::UnrecognizedOption {
                    path: base,
                    key: key.clone(),
                })
            }
        }
    }

    Ok(project)
}

fn credentials(path: &str, value: &Value) -> Result<Option<Credentials>, ConfigurationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(Credentials::from_string(s))),
        Value::Object(map) => Ok(Some(Credentials::Map(map.clone()))),
        _ => Err(ConfigurationError::invalid(path, CREDENTIALS_HINT)),
    }
}

fn string(path: &str, value: &Value) -> Result<Option<String>, ConfigurationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(ConfigurationError::invalid(
            path,
            format!("expected a string, but got {}", type_name(other)),
        )),
    }
}

fn boolean(path: &str, value: &Value) -> Result<Option<bool>, ConfigurationError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => Err(ConfigurationError::invalid(
            path,
            format!("expected a boolean, but got {}", type_name(other)),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}
