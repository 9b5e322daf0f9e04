// libs/matching-cell/src/services/scoring.rs
//
// Pure scoring functions. Everything here is deterministic in its inputs:
// the same slot, entry, weights and clock always produce the same score, so
// a re-score after a decline ranks the remaining pool exactly as the first
// pass did.
use chrono::{DateTime, Duration, Utc};

use cancellation_cell::models::SlotDetails;
use waitlist_cell::models::{Urgency, WaitlistEntry, WaitlistStatus};

use crate::models::ScoringWeights;

/// Hard eligibility pre-filter, applied before any scoring. Appointment type
/// must match; a provider preference, when present, must match the freed
/// slot's provider; only `waiting` entries qualify.
pub fn is_eligible(slot: &SlotDetails, entry: &WaitlistEntry) -> bool {
    entry.status == WaitlistStatus::Waiting
        && entry.requested.appointment_type == slot.appointment_type
        && entry
            .requested
            .provider_id
            .map_or(true, |p| p == slot.provider_id)
}

/// Categorical urgency signal.
pub fn urgency_component(urgency: &Urgency) -> f64 {
    match urgency {
        Urgency::Urgent => 1.0,
        Urgency::Routine => 0.5,
        Urgency::FollowUp => 0.3,
    }
}

/// Wait-time signal, monotonically non-decreasing in the time since the entry
/// was added and saturating at the configured horizon.
pub fn wait_time_component(
    added_at: DateTime<Utc>,
    now: DateTime<Utc>,
    saturation: Duration,
) -> f64 {
    let waited = (now - added_at).num_seconds().max(0) as f64;
    let horizon = saturation.num_seconds().max(1) as f64;
    (waited / horizon).min(1.0)
}

/// Attendance history signal: the inverse of the prior no-show rate. Patients
/// with no history sit at the neutral midpoint rather than zero.
pub fn history_component(no_show_rate: Option<f64>) -> f64 {
    match no_show_rate {
        Some(rate) => (1.0 - rate).clamp(0.0, 1.0),
        None => 0.5,
    }
}

/// Insurance compatibility signal. A slot with no accepted-insurance
/// restriction accepts everyone; an entry without recorded insurance gets the
/// neutral midpoint.
pub fn insurance_component(slot: &SlotDetails, entry: &WaitlistEntry) -> f64 {
    if slot.accepted_insurance.is_empty() {
        return 1.0;
    }
    match &entry.insurance {
        None => 0.5,
        Some(insurance) => {
            let accepted = slot
                .accepted_insurance
                .iter()
                .any(|network| network.eq_ignore_ascii_case(insurance));
            if accepted {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Weighted match score in [0, 1]. Callers must pass validated (normalized)
/// weights; the components are each bounded to [0, 1].
pub fn score(
    slot: &SlotDetails,
    entry: &WaitlistEntry,
    weights: &ScoringWeights,
    saturation: Duration,
    now: DateTime<Utc>,
) -> f64 {
    weights.urgency * urgency_component(&entry.urgency)
        + weights.wait_time * wait_time_component(entry.added_at, now, saturation)
        + weights.history * history_component(entry.no_show_rate)
        + weights.insurance * insurance_component(slot, entry)
}
