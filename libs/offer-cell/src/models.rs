// libs/offer-cell/src/models.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use cancellation_cell::models::{CancellationError, CancellationStats};
use notification_cell::models::{Channel, NotificationError};
use waitlist_cell::models::{WaitlistError, WaitlistStats};

// ==============================================================================
// OFFER MODELS
// ==============================================================================

/// A time-bounded proposal of a freed slot to one waitlist entry. Created and
/// owned exclusively by the scheduler; the waitlist entry and cancellation
/// event reference it by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub waitlist_entry_id: Uuid,
    pub cancellation_id: Uuid,
    pub patient_id: Uuid,
    pub channel: Channel,
    pub created_at: DateTime<Utc>,
    /// Earliest legal delivery instant. Equals `created_at` unless quiet
    /// hours or inactive days pushed delivery out.
    pub deliver_after: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    /// Hard response deadline: the response window counted from the planned
    /// delivery instant, re-armed from `sent_at` once actually delivered. A
    /// queued offer whose delivery keeps failing is bounded by this too.
    pub expires_at: DateTime<Utc>,
    pub outcome: OfferOutcome,
}

impl Offer {
    pub fn new(
        waitlist_entry_id: Uuid,
        cancellation_id: Uuid,
        patient_id: Uuid,
        channel: Channel,
        created_at: DateTime<Utc>,
        deliver_after: DateTime<Utc>,
        response_window: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            waitlist_entry_id,
            cancellation_id,
            patient_id,
            channel,
            created_at,
            deliver_after,
            sent_at: None,
            expires_at: deliver_after + response_window,
            outcome: OfferOutcome::Pending,
        }
    }

    pub fn is_deferred(&self) -> bool {
        self.outcome == OfferOutcome::Pending && self.sent_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OfferOutcome {
    Pending,
    Accepted,
    Declined,
    TimedOut,
}

impl OfferOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OfferOutcome::Pending)
    }
}

impl fmt::Display for OfferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferOutcome::Pending => write!(f, "pending"),
            OfferOutcome::Accepted => write!(f, "accepted"),
            OfferOutcome::Declined => write!(f, "declined"),
            OfferOutcome::TimedOut => write!(f, "timed_out"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// The only outcomes a recipient can report. Timeouts are produced by the
/// expiry sweep, never by a caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RespondedOutcome {
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferResponseRequest {
    pub outcome: RespondedOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferStats {
    pub pending: u64,
    pub deferred: u64,
    pub accepted: u64,
    pub declined: u64,
    pub timed_out: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub waitlist: WaitlistStats,
    pub cancellations: CancellationStats,
    pub offers: OfferStats,
}

/// Outcome of one background sweep pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub offers_timed_out: usize,
    pub deferred_deliveries: usize,
    pub slots_expired: usize,
}

// ==============================================================================
// OPERATOR ALERTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorAlert {
    pub alert_id: Uuid,
    pub severity: AlertSeverity,
    pub title: String,
    pub detail: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum OfferError {
    #[error("Offer not found: {0}")]
    OfferNotFound(Uuid),

    #[error("Offer {0} is already closed")]
    StaleResponse(Uuid),

    #[error("Slot {0} already has a pending offer")]
    OfferConflict(Uuid),

    #[error("Waitlist error: {0}")]
    Waitlist(#[from] WaitlistError),

    #[error("Cancellation error: {0}")]
    Cancellation(#[from] CancellationError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Appointment booking failed: {0}")]
    BookingFailed(String),
}
