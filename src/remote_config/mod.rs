//! Firebase Remote Config client.

use crate::core::ProjectContext;
use reqwest_middleware::ClientWithMiddleware;

const REMOTE_CONFIG_V1_API: &str =
    "https://firebaseremoteconfig.googleapis.com/v1/projects/{project_id}/remoteConfig";

/// Client for interacting with Firebase Remote Config.
pub struct FirebaseRemoteConfig {
    client: ClientWithMiddleware,
    base_url: String,
}

impl FirebaseRemoteConfig {
    pub fn new(context: ProjectContext) -> Self {
        let base_url = REMOTE_CONFIG_V1_API.replace("{project_id}", &context.project_id);
        Self {
            client: context.client,
            base_url,
        }
    }

    /// URL of the active template.
    pub fn template_url(&self) -> &str {
        &self.base_url
    }

    pub fn versions_url(&self) -> String {
        format!("{}:listVersions", self.base_url)
    }

    pub fn http_client(&self) -> &ClientWithMiddleware {
        &self.client
    }
}
