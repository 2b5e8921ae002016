use tracing::{info, warn};

use airnode_common::RegistrationInfo;

/// Fire-and-forget notification to the backing database when a user
/// registers the device locally. Failures are logged, never surfaced to
/// the portal caller.
pub fn spawn_notification(endpoint: String, info: RegistrationInfo) {
    tokio::spawn(async move {
        let client = reqwest::Client::new();
        match client.post(&endpoint).json(&info).send().await {
            Ok(response) => {
                info!(
                    "registration notification delivered to {endpoint}: HTTP {}",
                    response.status()
                );
            }
            Err(err) => warn!("registration notification to {endpoint} failed: {err}"),
        }
    });
}
