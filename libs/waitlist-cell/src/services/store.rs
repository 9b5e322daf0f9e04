// libs/waitlist-cell/src/services/store.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::appointment::AppointmentType;

use crate::models::{
    AddWaitlistEntryRequest, WaitlistEntry, WaitlistError, WaitlistStats, WaitlistStatus,
};

/// In-memory waitlist store. All writes that decide an entry's fate go through
/// compare-and-set style methods under a single write lock, so two slots
/// racing for the same entry resolve to exactly one winner.
pub struct WaitlistStoreService {
    entries: Arc<RwLock<HashMap<Uuid, WaitlistEntry>>>,
}

impl WaitlistStoreService {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert(
        &self,
        request: AddWaitlistEntryRequest,
        now: DateTime<Utc>,
    ) -> Result<WaitlistEntry, WaitlistError> {
        if let Some(rate) = request.no_show_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(WaitlistError::ValidationError(format!(
                    "no_show_rate must be within [0, 1], got {}",
                    rate
                )));
            }
        }
        if request.requested.window_end <= request.requested.window_start {
            return Err(WaitlistError::ValidationError(
                "requested time window must end after it starts".to_string(),
            ));
        }

        let entry = WaitlistEntry {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            requested: request.requested,
            urgency: request.urgency,
            added_at: now,
            status: WaitlistStatus::Waiting,
            contact_attempts: 0,
            last_contact_at: None,
            last_declined_at: None,
            notes: request.notes,
            insurance: request.insurance,
            no_show_rate: request.no_show_rate,
        };

        let mut entries = self.entries.write().await;
        entries.insert(entry.id, entry.clone());

        info!("Waitlist entry {} added for patient {}", entry.id, entry.patient_id);
        Ok(entry)
    }

    pub async fn get(&self, id: Uuid) -> Option<WaitlistEntry> {
        let entries = self.entries.read().await;
        entries.get(&id).cloned()
    }

    /// All non-terminal entries, oldest first.
    pub async fn list(&self) -> Vec<WaitlistEntry> {
        let entries = self.entries.read().await;
        let mut listed: Vec<WaitlistEntry> = entries
            .values()
            .filter(|e| !e.status.is_terminal())
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.added_at.cmp(&b.added_at).then(a.id.cmp(&b.id)));
        listed
    }

    /// Consistent snapshot of `waiting` entries passing the hard eligibility
    /// pre-filter: appointment type must match, and the entry's provider
    /// preference (when present) must match the freed slot's provider.
    pub async fn find_eligible(
        &self,
        appointment_type: &AppointmentType,
        provider_id: Uuid,
    ) -> Vec<WaitlistEntry> {
        let entries = self.entries.read().await;
        let mut eligible: Vec<WaitlistEntry> = entries
            .values()
            .filter(|e| e.status == WaitlistStatus::Waiting)
            .filter(|e| e.requested.appointment_type == *appointment_type)
            .filter(|e| e.requested.provider_id.map_or(true, |p| p == provider_id))
            .cloned()
            .collect();
        eligible.sort_by(|a, b| a.added_at.cmp(&b.added_at).then(a.id.cmp(&b.id)));

        debug!(
            "Found {} eligible waitlist entries for {} with provider {}",
            eligible.len(),
            appointment_type,
            provider_id
        );
        eligible
    }

    /// Generic validated status transition for manual/administrative updates.
    pub async fn update_status(
        &self,
        id: Uuid,
        new_status: WaitlistStatus,
    ) -> Result<WaitlistEntry, WaitlistError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&id).ok_or(WaitlistError::NotFound(id))?;

        if !entry.status.can_transition_to(&new_status) {
            warn!(
                "Invalid waitlist status transition attempted: {} -> {} for entry {}",
                entry.status, new_status, id
            );
            return Err(WaitlistError::InvalidStatusTransition {
                from: entry.status,
                to: new_status,
            });
        }

        let old_status = entry.status;
        entry.status = new_status;
        debug!("Waitlist entry {} moved from {} to {}", id, old_status, new_status);
        Ok(entry.clone())
    }

    /// Compare-and-set `waiting -> offered` plus contact-attempt accounting,
    /// all under one write lock. The losing side of a race observes a
    /// `StatusConflict` and simply rescores the remaining pool.
    pub async fn try_mark_offered(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<WaitlistEntry, WaitlistError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&id).ok_or(WaitlistError::NotFound(id))?;

        if entry.status != WaitlistStatus::Waiting {
            return Err(WaitlistError::StatusConflict {
                entry_id: id,
                expected: WaitlistStatus::Waiting,
                found: entry.status,
            });
        }

        if entry.contact_attempts >= max_attempts {
            entry.status = WaitlistStatus::Expired;
            warn!(
                "Waitlist entry {} exhausted {} contact attempts, expiring",
                id, max_attempts
            );
            return Err(WaitlistError::ContactAttemptsExhausted {
                entry_id: id,
                max_attempts,
            });
        }

        entry.status = WaitlistStatus::Offered;
        entry.contact_attempts += 1;
        entry.last_contact_at = Some(now);

        debug!(
            "Waitlist entry {} marked offered (attempt {}/{})",
            id, entry.contact_attempts, max_attempts
        );
        Ok(entry.clone())
    }

    /// The offer notification actually went out.
    pub async fn mark_contacted(&self, id: Uuid) -> Result<WaitlistEntry, WaitlistError> {
        self.transition_from(id, WaitlistStatus::Offered, WaitlistStatus::Contacted)
            .await
    }

    /// An offer closed without acceptance. The attempt stays counted; an entry
    /// at the attempt ceiling expires instead of returning to the pool.
    pub async fn release_offer(
        &self,
        id: Uuid,
        max_attempts: u32,
        declined: bool,
        now: DateTime<Utc>,
    ) -> Result<WaitlistEntry, WaitlistError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&id).ok_or(WaitlistError::NotFound(id))?;

        if !matches!(entry.status, WaitlistStatus::Offered | WaitlistStatus::Contacted) {
            return Err(WaitlistError::StatusConflict {
                entry_id: id,
                expected: WaitlistStatus::Offered,
                found: entry.status,
            });
        }

        if declined {
            entry.last_declined_at = Some(now);
        }

        if entry.contact_attempts >= max_attempts {
            entry.status = WaitlistStatus::Expired;
            info!(
                "Waitlist entry {} expired after {} contact attempts",
                id, entry.contact_attempts
            );
        } else {
            entry.status = WaitlistStatus::Waiting;
            debug!(
                "Waitlist entry {} released back to waiting ({}/{} attempts used)",
                id, entry.contact_attempts, max_attempts
            );
        }

        Ok(entry.clone())
    }

    pub async fn mark_scheduled(&self, id: Uuid) -> Result<WaitlistEntry, WaitlistError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&id).ok_or(WaitlistError::NotFound(id))?;

        if !matches!(entry.status, WaitlistStatus::Offered | WaitlistStatus::Contacted) {
            return Err(WaitlistError::StatusConflict {
                entry_id: id,
                expected: WaitlistStatus::Offered,
                found: entry.status,
            });
        }

        entry.status = WaitlistStatus::Scheduled;
        info!("Waitlist entry {} scheduled", id);
        Ok(entry.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Result<WaitlistEntry, WaitlistError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&id).ok_or(WaitlistError::NotFound(id))?;

        if entry.status.is_terminal() {
            return Err(WaitlistError::InvalidStatusTransition {
                from: entry.status,
                to: WaitlistStatus::Removed,
            });
        }

        entry.status = WaitlistStatus::Removed;
        info!("Waitlist entry {} removed", id);
        Ok(entry.clone())
    }

    pub async fn stats(&self) -> WaitlistStats {
        let entries = self.entries.read().await;
        let mut stats = WaitlistStats {
            waiting: 0,
            offered: 0,
            contacted: 0,
            scheduled: 0,
            expired: 0,
            removed: 0,
            total: entries.len() as u64,
        };

        for entry in entries.values() {
            match entry.status {
                WaitlistStatus::Waiting => stats.waiting += 1,
                WaitlistStatus::Offered => stats.offered += 1,
                WaitlistStatus::Contacted => stats.contacted += 1,
                WaitlistStatus::Scheduled => stats.scheduled += 1,
                WaitlistStatus::Expired => stats.expired += 1,
                WaitlistStatus::Removed => stats.removed += 1,
            }
        }

        stats
    }

    async fn transition_from(
        &self,
        id: Uuid,
        expected: WaitlistStatus,
        target: WaitlistStatus,
    ) -> Result<WaitlistEntry, WaitlistError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&id).ok_or(WaitlistError::NotFound(id))?;

        if entry.status != expected {
            return Err(WaitlistError::StatusConflict {
                entry_id: id,
                expected,
                found: entry.status,
            });
        }

        entry.status = target;
        debug!("Waitlist entry {} moved from {} to {}", id, expected, target);
        Ok(entry.clone())
    }
}

impl Default for WaitlistStoreService {
    fn default() -> Self {
        Self::new()
    }
}
