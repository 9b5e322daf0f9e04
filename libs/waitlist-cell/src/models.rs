// libs/waitlist-cell/src/models.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use shared_models::appointment::AppointmentType;

// ==============================================================================
// CORE WAITLIST MODELS
// ==============================================================================

/// The slot a patient asked to be waitlisted for. The appointment type and
/// provider preference are hard eligibility constraints; date and time window
/// are advisory and only surface in match reasons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedSlot {
    pub date: NaiveDate,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub appointment_type: AppointmentType,
    pub provider_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub requested: RequestedSlot,
    pub urgency: Urgency,
    pub added_at: DateTime<Utc>,
    pub status: WaitlistStatus,
    pub contact_attempts: u32,
    pub last_contact_at: Option<DateTime<Utc>>,
    pub last_declined_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub insurance: Option<String>,
    /// Fraction of prior appointments missed, supplied by the patient-record
    /// collaborator. Absent for new patients.
    pub no_show_rate: Option<f64>,
}

impl WaitlistEntry {
    /// Display-only priority bucket derived from urgency and accumulated wait.
    /// Never stored; dashboards read it, nothing writes it.
    pub fn display_priority(&self, now: DateTime<Utc>) -> DisplayPriority {
        let waited_long = now - self.added_at >= Duration::days(7);
        match (&self.urgency, waited_long) {
            (Urgency::Urgent, _) => DisplayPriority::High,
            (Urgency::Routine, true) => DisplayPriority::High,
            (Urgency::Routine, false) => DisplayPriority::Medium,
            (Urgency::FollowUp, true) => DisplayPriority::Medium,
            (Urgency::FollowUp, false) => DisplayPriority::Low,
        }
    }

    pub fn days_waiting(&self, now: DateTime<Utc>) -> i64 {
        (now - self.added_at).num_days().max(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Urgent,
    Routine,
    FollowUp,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Urgent => write!(f, "urgent"),
            Urgency::Routine => write!(f, "routine"),
            Urgency::FollowUp => write!(f, "followup"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisplayPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistStatus {
    /// Eligible for matching.
    Waiting,
    /// An open offer exists for this entry (not necessarily delivered yet).
    Offered,
    /// The offer notification was actually dispatched to the patient.
    Contacted,
    /// Accepted an offer; the slot is booked.
    Scheduled,
    /// Contact attempts exhausted; no longer matched.
    Expired,
    /// Withdrawn by the patient or staff.
    Removed,
}

impl WaitlistStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WaitlistStatus::Scheduled | WaitlistStatus::Expired | WaitlistStatus::Removed
        )
    }

    pub fn can_transition_to(&self, target: &WaitlistStatus) -> bool {
        use WaitlistStatus::*;
        match (self, target) {
            (Waiting, Offered) => true,
            (Offered, Contacted) => true,
            (Offered, Waiting) | (Contacted, Waiting) => true,
            (Offered, Scheduled) | (Contacted, Scheduled) => true,
            (Waiting, Expired) | (Offered, Expired) | (Contacted, Expired) => true,
            (_, Removed) => !self.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for WaitlistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitlistStatus::Waiting => write!(f, "waiting"),
            WaitlistStatus::Offered => write!(f, "offered"),
            WaitlistStatus::Contacted => write!(f, "contacted"),
            WaitlistStatus::Scheduled => write!(f, "scheduled"),
            WaitlistStatus::Expired => write!(f, "expired"),
            WaitlistStatus::Removed => write!(f, "removed"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddWaitlistEntryRequest {
    pub patient_id: Uuid,
    pub requested: RequestedSlot,
    pub urgency: Urgency,
    pub notes: Option<String>,
    pub insurance: Option<String>,
    pub no_show_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistStats {
    pub waiting: u64,
    pub offered: u64,
    pub contacted: u64,
    pub scheduled: u64,
    pub expired: u64,
    pub removed: u64,
    pub total: u64,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum WaitlistError {
    #[error("Waitlist entry not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: WaitlistStatus, to: WaitlistStatus },

    #[error("Entry {entry_id} is in state {found}, expected {expected}")]
    StatusConflict {
        entry_id: Uuid,
        expected: WaitlistStatus,
        found: WaitlistStatus,
    },

    #[error("Contact attempts exhausted for entry {entry_id} (max {max_attempts})")]
    ContactAttemptsExhausted { entry_id: Uuid, max_attempts: u32 },

    #[error("Validation error: {0}")]
    ValidationError(String),
}
