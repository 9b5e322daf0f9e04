// libs/notification-cell/src/models.rs
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

// ==============================================================================
// CHANNELS AND CONTACT DETAILS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Sms,
    Email,
    InApp,
    Push,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Sms => write!(f, "sms"),
            Channel::Email => write!(f, "email"),
            Channel::InApp => write!(f, "in_app"),
            Channel::Push => write!(f, "push"),
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "sms" => Ok(Channel::Sms),
            "email" => Ok(Channel::Email),
            "in_app" | "inapp" => Ok(Channel::InApp),
            "push" => Ok(Channel::Push),
            other => Err(format!("unknown channel: {}", other)),
        }
    }
}

/// Parse a configured priority list, skipping unknown names.
pub fn parse_channel_priority(raw: &[String]) -> Vec<Channel> {
    let mut priority = Vec::new();
    for name in raw {
        match name.parse::<Channel>() {
            Ok(channel) if !priority.contains(&channel) => priority.push(channel),
            Ok(_) => {}
            Err(e) => warn!("Ignoring channel in priority order: {}", e),
        }
    }
    priority
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactDetails {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub device_token: Option<String>,
    /// Inbox key for in-app delivery; normally the patient id.
    pub account_id: Option<Uuid>,
}

// ==============================================================================
// NOTIFICATION PREFERENCES
// ==============================================================================

/// Per-recipient delivery preferences, supplied by the patient-facing
/// settings surface and consumed read-only when scheduling offers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub patient_id: Uuid,
    pub sms_enabled: bool,
    pub email_enabled: bool,
    pub in_app_enabled: bool,
    pub push_enabled: bool,
    /// Quiet hours suppress delivery; a window that starts after it ends
    /// wraps past midnight (22:00-08:00).
    pub quiet_hours_start: Option<NaiveTime>,
    pub quiet_hours_end: Option<NaiveTime>,
    /// ISO weekday numbers, Monday = 1 through Sunday = 7.
    pub active_days: Vec<u8>,
    pub contact: ContactDetails,
}

impl NotificationPreference {
    /// Defaults used when a patient never saved preferences: reachable on the
    /// common channels, any day, no quiet hours.
    pub fn default_for(patient_id: Uuid) -> Self {
        Self {
            patient_id,
            sms_enabled: true,
            email_enabled: true,
            in_app_enabled: true,
            push_enabled: false,
            quiet_hours_start: None,
            quiet_hours_end: None,
            active_days: (1..=7).collect(),
            contact: ContactDetails {
                account_id: Some(patient_id),
                ..ContactDetails::default()
            },
        }
    }

    pub fn channel_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Sms => self.sms_enabled,
            Channel::Email => self.email_enabled,
            Channel::InApp => self.in_app_enabled,
            Channel::Push => self.push_enabled,
        }
    }

    pub fn any_channel_enabled(&self, priority: &[Channel]) -> bool {
        priority.iter().any(|c| self.channel_enabled(*c))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertPreferenceRequest {
    pub sms_enabled: bool,
    pub email_enabled: bool,
    pub in_app_enabled: bool,
    pub push_enabled: bool,
    pub quiet_hours_start: Option<NaiveTime>,
    pub quiet_hours_end: Option<NaiveTime>,
    pub active_days: Vec<u8>,
    pub contact: ContactDetails,
}

// ==============================================================================
// DELIVERY RESULTS AND ERRORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub channel: Channel,
    pub accepted: bool,
    pub provider_message_id: Option<String>,
    pub detail: Option<String>,
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("No deliverable channel for recipient")]
    NoDeliverableChannel,

    #[error("Invalid contact details: {0}")]
    InvalidContact(String),

    #[error("Notification gateway error: {0}")]
    GatewayError(String),

    #[error("Delivery rejected by gateway: {0}")]
    DeliveryRejected(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
