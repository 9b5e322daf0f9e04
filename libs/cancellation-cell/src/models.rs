// libs/cancellation-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use shared_models::appointment::AppointmentType;

// ==============================================================================
// CORE CANCELLATION MODELS
// ==============================================================================

/// The freed slot as it existed on the calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDetails {
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub appointment_type: AppointmentType,
    pub provider_id: Uuid,
    /// Insurance networks this slot's provider accepts. Empty means no
    /// restriction.
    pub accepted_insurance: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationEvent {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub original_slot: SlotDetails,
    pub cancelled_at: DateTime<Utc>,
    pub reason: CancellationReason,
    pub fill_status: FillStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    PatientCancelled,
    ProviderCancelled,
    NoShow,
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancellationReason::PatientCancelled => write!(f, "patient_cancelled"),
            CancellationReason::ProviderCancelled => write!(f, "provider_cancelled"),
            CancellationReason::NoShow => write!(f, "no_show"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FillStatus {
    /// Freed and waiting for a match.
    Open,
    /// Exactly one offer is outstanding for this slot.
    OfferPending,
    /// A waitlisted patient accepted; the slot is booked.
    Filled,
    /// Nobody accepted within the fill window.
    UnfilledExpired,
}

impl FillStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FillStatus::Filled | FillStatus::UnfilledExpired)
    }

    pub fn can_transition_to(&self, target: &FillStatus) -> bool {
        use FillStatus::*;
        match (self, target) {
            (Open, OfferPending) => true,
            (OfferPending, Open) => true,
            (OfferPending, Filled) => true,
            (Open, UnfilledExpired) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillStatus::Open => write!(f, "open"),
            FillStatus::OfferPending => write!(f, "offer_pending"),
            FillStatus::Filled => write!(f, "filled"),
            FillStatus::UnfilledExpired => write!(f, "unfilled_expired"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyCancellationRequest {
    pub appointment_id: Uuid,
    pub original_slot: SlotDetails,
    pub reason: CancellationReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationStats {
    pub open: u64,
    pub offer_pending: u64,
    pub filled: u64,
    pub unfilled_expired: u64,
    pub total: u64,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum CancellationError {
    #[error("Cancellation event not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid fill status transition from {from} to {to}")]
    InvalidStatusTransition { from: FillStatus, to: FillStatus },

    #[error("Cancellation {event_id} is in state {found}, expected {expected}")]
    StatusConflict {
        event_id: Uuid,
        expected: FillStatus,
        found: FillStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}
