// libs/matching-cell/src/services/matcher.rs
use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use cancellation_cell::models::CancellationEvent;
use shared_config::AppConfig;
use waitlist_cell::models::{Urgency, WaitlistEntry};

use crate::models::{MatchCandidate, MatchingError, ScoringWeights};
use crate::services::scoring;

/// Ranks eligible waitlist entries for a freed slot. The matcher never
/// mutates entries or slots; callers apply the resulting transitions.
pub struct MatcherService {
    weights: ScoringWeights,
    wait_saturation: Duration,
    max_contact_attempts: u32,
    contact_interval: Duration,
}

impl MatcherService {
    pub fn new(config: &AppConfig) -> Result<Self, MatchingError> {
        Ok(Self {
            weights: ScoringWeights::from_config(config)?,
            wait_saturation: Duration::days(config.wait_saturation_days),
            max_contact_attempts: config.max_contact_attempts,
            contact_interval: Duration::hours(config.contact_interval_hours),
        })
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Best candidate for the slot, or `None` when the filtered pool is
    /// empty. The caller leaves an unmatched slot open for later retries; it
    /// is only finalized once the overall fill window elapses.
    pub fn match_slot(
        &self,
        slot: &CancellationEvent,
        pool: &[WaitlistEntry],
        excluded: &HashSet<Uuid>,
        now: DateTime<Utc>,
    ) -> Option<MatchCandidate> {
        self.rank_slot(slot, pool, excluded, now).into_iter().next()
    }

    /// Full ranking, highest score first. Ties resolve to the earlier
    /// `added_at`, then the smaller id, so repeated runs over the same pool
    /// always produce the same order.
    pub fn rank_slot(
        &self,
        slot: &CancellationEvent,
        pool: &[WaitlistEntry],
        excluded: &HashSet<Uuid>,
        now: DateTime<Utc>,
    ) -> Vec<MatchCandidate> {
        let mut candidates: Vec<MatchCandidate> = pool
            .iter()
            .filter(|entry| self.eligible_for_offer(slot, entry, excluded, now))
            .map(|entry| self.candidate(slot, entry, now))
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entry.added_at.cmp(&b.entry.added_at))
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });

        debug!(
            "Ranked {} candidates for cancellation {} (pool of {})",
            candidates.len(),
            slot.id,
            pool.len()
        );
        candidates
    }

    fn eligible_for_offer(
        &self,
        slot: &CancellationEvent,
        entry: &WaitlistEntry,
        excluded: &HashSet<Uuid>,
        now: DateTime<Utc>,
    ) -> bool {
        if excluded.contains(&entry.id) {
            return false;
        }
        if !scoring::is_eligible(&slot.original_slot, entry) {
            return false;
        }
        if entry.contact_attempts >= self.max_contact_attempts {
            return false;
        }
        // A patient who just declined an offer is left alone for the contact
        // interval before being approached about other slots. Timed-out
        // offers carry no such cool-down.
        if let Some(declined_at) = entry.last_declined_at {
            if declined_at + self.contact_interval > now {
                return false;
            }
        }
        true
    }

    fn candidate(
        &self,
        slot: &CancellationEvent,
        entry: &WaitlistEntry,
        now: DateTime<Utc>,
    ) -> MatchCandidate {
        let score = scoring::score(
            &slot.original_slot,
            entry,
            &self.weights,
            self.wait_saturation,
            now,
        );

        MatchCandidate {
            entry: entry.clone(),
            score,
            match_reasons: self.match_reasons(slot, entry, now),
        }
    }

    fn match_reasons(
        &self,
        slot: &CancellationEvent,
        entry: &WaitlistEntry,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut reasons = Vec::new();

        match entry.urgency {
            Urgency::Urgent => reasons.push("Urgent request".to_string()),
            Urgency::Routine => {}
            Urgency::FollowUp => reasons.push("Follow-up visit".to_string()),
        }

        let days = entry.days_waiting(now);
        if days >= 1 {
            reasons.push(format!("Waiting {} day(s)", days));
        }

        if entry.requested.provider_id == Some(slot.original_slot.provider_id) {
            reasons.push("Preferred provider".to_string());
        }

        if let Some(rate) = entry.no_show_rate {
            if rate <= 0.1 {
                reasons.push("Reliable attendance record".to_string());
            }
        }

        let slot_time = slot.original_slot.starts_at.time();
        if slot.original_slot.starts_at.date_naive() == entry.requested.date
            && slot_time >= entry.requested.window_start
            && slot_time <= entry.requested.window_end
        {
            reasons.push("Inside the requested time window".to_string());
        }

        reasons
    }
}
