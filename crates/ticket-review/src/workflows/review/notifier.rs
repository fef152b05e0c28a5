use std::time::Duration;

use tracing::{info, warn};

use super::repository::{NotificationError, RejectionNotifier, WebhookDelivery};

/// Posts rejection events over HTTP on a detached task.
///
/// Delivery is at most once: no retry, bounded by the client timeout, and failures only
/// reach the logs.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| NotificationError::Client(err.to_string()))?;
        Ok(Self { client })
    }

    /// Send one delivery and wait for the response.
    pub async fn deliver(&self, delivery: &WebhookDelivery) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&delivery.url)
            .json(&delivery.event)
            .send()
            .await
            .map_err(|err| NotificationError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotificationError::Rejected(status.as_u16()))
        }
    }
}

impl RejectionNotifier for WebhookNotifier {
    fn dispatch(&self, delivery: WebhookDelivery) -> Result<(), NotificationError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| NotificationError::RuntimeUnavailable)?;
        let notifier = self.clone();

        runtime.spawn(async move {
            match notifier.deliver(&delivery).await {
                Ok(()) => info!(
                    item_id = %delivery.event.payload.id,
                    target = %delivery.url,
                    "rejection webhook delivered"
                ),
                Err(err) => warn!(
                    item_id = %delivery.event.payload.id,
                    target = %delivery.url,
                    error = %err,
                    "rejection webhook delivery failed"
                ),
            }
        });

        Ok(())
    }
}
