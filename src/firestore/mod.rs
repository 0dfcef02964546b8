//! Cloud Firestore client.

use crate::core::ProjectContext;
use reqwest_middleware::ClientWithMiddleware;

const FIRESTORE_V1_API: &str = "https://firestore.googleapis.com/v1/projects/{project_id}/databases/{database_id}";
const DEFAULT_DATABASE: &str = "(default)";

pub struct FirebaseFirestore {
    client: ClientWithMiddleware,
    project_id: String,
    database_id: String,
}

impl FirebaseFirestore {
    pub fn new(context: ProjectContext) -> Self {
        Self {
            client: context.client,
            project_id: context.project_id,
            database_id: DEFAULT_DATABASE.to_string(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub fn database_url(&self) -> String {
        FIRESTORE_V1_API
            .replace("{project_id}", &self.project_id)
            .replace("{database_id}", &self.database_id)
    }

    /// URL of the document (or collection) at `path`.
    pub fn document_url(&self, path: &str) -> String {
        format!("{}/documents/{}", self.database_url(), path.trim_matches('/'))
    }

    pub fn http_client(&self) -> &ClientWithMiddleware {
        &self.client
    }
}
