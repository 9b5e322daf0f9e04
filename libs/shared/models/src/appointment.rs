use serde::{Deserialize, Serialize};
use std::fmt;

/// Appointment categories shared by the waitlist and cancellation feeds.
/// PascalCase on the wire with snake_case aliases for legacy callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum AppointmentType {
    #[serde(alias = "consultation", alias = "general_consultation", alias = "general")]
    Consultation,

    #[serde(alias = "follow_up", alias = "followup")]
    FollowUp,

    #[serde(alias = "procedure")]
    Procedure,

    #[serde(alias = "urgent_care", alias = "urgent")]
    UrgentCare,

    #[serde(alias = "wellness", alias = "health_screening", alias = "screening")]
    Wellness,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Consultation => write!(f, "Consultation"),
            AppointmentType::FollowUp => write!(f, "FollowUp"),
            AppointmentType::Procedure => write!(f, "Procedure"),
            AppointmentType::UrgentCare => write!(f, "UrgentCare"),
            AppointmentType::Wellness => write!(f, "Wellness"),
        }
    }
}
