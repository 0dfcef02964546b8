//! Firebase Realtime Database client.

use crate::core::{ConstructionError, ProjectContext};
use reqwest_middleware::ClientWithMiddleware;
use url::Url;

pub struct FirebaseDatabase {
    client: ClientWithMiddleware,
    base_url: Url,
}

impl FirebaseDatabase {
    /// Uses `database_uri` when given, otherwise the project's default database
    /// (`https://{project_id}-default-rtdb.firebaseio.com`).
    pub fn new(context: ProjectContext, database_uri: Option<&str>) -> Result<Self, ConstructionError> {
        let uri = match database_uri {
            Some(uri) => uri.to_string(),
            None => format!("https://{}-default-rtdb.firebaseio.com", context.project_id),
        };
        let base_url = Url::parse(&uri).map_err(|source| ConstructionError::InvalidDatabaseUri { uri, source })?;

        Ok(Self {
            client: context.client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn http_client(&self) -> &ClientWithMiddleware {
        &self.client
    }

    /// REST URL of the node at `path`.
    pub fn reference(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_matches('/');
        if path.is_empty() {
            format!("{}/.json", base)
        } else {
            format!("{}/{}.json", base, path)
        }
    }
}
