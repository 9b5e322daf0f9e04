// libs/notification-cell/src/services/preferences.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{NotificationError, NotificationPreference, UpsertPreferenceRequest};

/// Read-mostly store of per-patient notification preferences. The scheduler
/// consults it on every offer; the patient settings surface writes it.
pub struct PreferenceStoreService {
    preferences: Arc<RwLock<HashMap<Uuid, NotificationPreference>>>,
}

impl PreferenceStoreService {
    pub fn new() -> Self {
        Self {
            preferences: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn upsert(
        &self,
        patient_id: Uuid,
        request: UpsertPreferenceRequest,
    ) -> Result<NotificationPreference, NotificationError> {
        if request.active_days.iter().any(|d| !(1..=7).contains(d)) {
            return Err(NotificationError::ValidationError(
                "active_days must contain ISO weekday numbers 1-7".to_string(),
            ));
        }
        if request.quiet_hours_start.is_some() != request.quiet_hours_end.is_some() {
            return Err(NotificationError::ValidationError(
                "quiet hours need both a start and an end".to_string(),
            ));
        }

        let mut contact = request.contact;
        if contact.account_id.is_none() {
            contact.account_id = Some(patient_id);
        }

        let preference = NotificationPreference {
            patient_id,
            sms_enabled: request.sms_enabled,
            email_enabled: request.email_enabled,
            in_app_enabled: request.in_app_enabled,
            push_enabled: request.push_enabled,
            quiet_hours_start: request.quiet_hours_start,
            quiet_hours_end: request.quiet_hours_end,
            active_days: request.active_days,
            contact,
        };

        let mut preferences = self.preferences.write().await;
        preferences.insert(patient_id, preference.clone());

        info!("Notification preferences saved for patient {}", patient_id);
        Ok(preference)
    }

    pub async fn get(&self, patient_id: Uuid) -> Option<NotificationPreference> {
        let preferences = self.preferences.read().await;
        preferences.get(&patient_id).cloned()
    }

    /// Preferences for scheduling: saved ones, or the reachable defaults.
    pub async fn get_or_default(&self, patient_id: Uuid) -> NotificationPreference {
        match self.get(patient_id).await {
            Some(preference) => preference,
            None => {
                debug!(
                    "No saved preferences for patient {}, using defaults",
                    patient_id
                );
                NotificationPreference::default_for(patient_id)
            }
        }
    }
}

impl Default for PreferenceStoreService {
    fn default() -> Self {
        Self::new()
    }
}
