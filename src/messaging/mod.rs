//! Firebase Cloud Messaging client.

use crate::core::ProjectContext;
use reqwest_middleware::ClientWithMiddleware;

const FCM_V1_API: &str = "https://fcm.googleapis.com/v1/projects/{project_id}";
const IID_API: &str = "https://iid.googleapis.com/iid/v1";

#[derive(Clone)]
pub struct FirebaseMessaging {
    client: ClientWithMiddleware,
    project_id: String,
}

impl FirebaseMessaging {
    pub fn new(context: ProjectContext) -> Self {
        Self {
            client: context.client,
            project_id: context.project_id,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn send_url(&self) -> String {
        format!("{}/messages:send", FCM_V1_API.replace("{project_id}", &self.project_id))
    }

    /// Topic subscriptions go through the Instance ID API.
    pub fn topic_management_url(&self, subscribe: bool) -> String {
        let action = if subscribe { "batchAdd" } else { "batchRemove" };
        format!("{}:{}", IID_API, action)
    }

    pub fn http_client(&self) -> &ClientWithMiddleware {
        &self.client
    }
}
