//! Cloud Storage for Firebase client.

use crate::core::ProjectContext;
use reqwest_middleware::ClientWithMiddleware;

const STORAGE_V1_API: &str = "https://storage.googleapis.com/storage/v1";

/// Client for the Cloud Storage buckets of a project.
#[derive(Clone)]
pub struct FirebaseStorage {
    client: ClientWithMiddleware,
    pub base_url: String,
    pub project_id: String,
}

impl FirebaseStorage {
    pub fn new(context: ProjectContext) -> Self {
        Self {
            client: context.client,
            base_url: STORAGE_V1_API.to_string(),
            project_id: context.project_id,
        }
    }

    pub fn http_client(&self) -> &ClientWithMiddleware {
        &self.client
    }

    /// The bucket created with the project, `{project_id}.appspot.com`.
    pub fn default_bucket(&self) -> String {
        format!("{}.appspot.com", self.project_id)
    }

    /// API URL of `name`, or of the default bucket.
    pub fn bucket_url(&self, name: Option<&str>) -> String {
        let bucket = match name {
            Some(n) => n.to_string(),
            None => self.default_bucket(),
        };
        format!("{}/b/{}", self.base_url, bucket)
    }
}
