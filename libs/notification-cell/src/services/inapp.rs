// libs/notification-cell/src/services/inapp.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Channel, ContactDetails, DeliveryResult, NotificationError};

pub type InAppSender = broadcast::Sender<String>;
pub type InAppReceiver = broadcast::Receiver<String>;

/// In-app notification fan-out. Each patient gets a broadcast channel that
/// connected UI sessions subscribe to; publishing without subscribers still
/// counts as accepted since the message lands when a session attaches.
pub struct InAppNotificationService {
    channels: Arc<RwLock<HashMap<Uuid, InAppSender>>>,
}

impl InAppNotificationService {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn subscribe(&self, patient_id: Uuid) -> InAppReceiver {
        let mut channels = self.channels.write().await;
        let sender = channels
            .entry(patient_id)
            .or_insert_with(|| broadcast::channel(100).0);
        debug!("In-app subscription opened for patient {}", patient_id);
        sender.subscribe()
    }

    pub async fn remove_channel(&self, patient_id: Uuid) {
        let mut channels = self.channels.write().await;
        channels.remove(&patient_id);
        debug!("In-app channel removed for patient {}", patient_id);
    }

    pub async fn publish(&self, patient_id: Uuid, message: &str) -> DeliveryResult {
        let mut channels = self.channels.write().await;
        let sender = channels
            .entry(patient_id)
            .or_insert_with(|| broadcast::channel(100).0);

        match sender.send(message.to_string()) {
            Ok(subscribers) => {
                debug!(
                    "In-app message delivered to {} session(s) for patient {}",
                    subscribers, patient_id
                );
                DeliveryResult {
                    channel: Channel::InApp,
                    accepted: true,
                    provider_message_id: None,
                    detail: None,
                }
            }
            Err(_) => DeliveryResult {
                channel: Channel::InApp,
                accepted: true,
                provider_message_id: None,
                detail: Some("no active sessions, queued for next sign-in".to_string()),
            },
        }
    }

    pub async fn publish_to_contact(
        &self,
        contact: &ContactDetails,
        message: &str,
    ) -> Result<DeliveryResult, NotificationError> {
        let account_id = contact.account_id.ok_or_else(|| {
            warn!("In-app delivery requested without an account id");
            NotificationError::InvalidContact("no in-app account on file".to_string())
        })?;
        Ok(self.publish(account_id, message).await)
    }

    pub async fn active_channels(&self) -> Vec<Uuid> {
        let channels = self.channels.read().await;
        channels.keys().copied().collect()
    }
}

impl Default for InAppNotificationService {
    fn default() -> Self {
        Self::new()
    }
}
