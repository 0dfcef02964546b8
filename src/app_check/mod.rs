//! Firebase App Check client.

use crate::core::ProjectContext;
use reqwest_middleware::ClientWithMiddleware;

const APP_CHECK_V1_API: &str = "https://firebaseappcheck.googleapis.com/v1/projects/{project_id}";

pub struct FirebaseAppCheck {
    client: ClientWithMiddleware,
    base_url: String,
}

impl FirebaseAppCheck {
    pub fn new(context: ProjectContext) -> Self {
        Self {
            client: context.client,
            base_url: APP_CHECK_V1_API.replace("{project_id}", &context.project_id),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL used to mint an App Check token for `app_id`.
    pub fn exchange_url(&self, app_id: &str) -> String {
        format!("{}/apps/{}:exchangeCustomToken", self.base_url, app_id)
    }

    pub fn http_client(&self) -> &ClientWithMiddleware {
        &self.client
    }
}
