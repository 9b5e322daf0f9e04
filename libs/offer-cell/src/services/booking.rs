// libs/offer-cell/src/services/booking.rs
use async_trait::async_trait;
use tracing::{error, info};
use uuid::Uuid;

use cancellation_cell::models::SlotDetails;
use shared_config::AppConfig;

use crate::models::OfferError;

/// Outbound boundary to the scheduling/calendar subsystem. Called exactly
/// once per accepted offer.
#[async_trait]
pub trait AppointmentBooking: Send + Sync {
    async fn book_appointment(
        &self,
        patient_id: Uuid,
        slot: &SlotDetails,
    ) -> Result<Uuid, OfferError>;
}

/// HTTP client for the calendar service's booking endpoint.
pub struct HttpBookingClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBookingClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.booking_api_url.clone(),
        }
    }
}

#[async_trait]
impl AppointmentBooking for HttpBookingClient {
    async fn book_appointment(
        &self,
        patient_id: Uuid,
        slot: &SlotDetails,
    ) -> Result<Uuid, OfferError> {
        if self.base_url.is_empty() {
            return Err(OfferError::BookingFailed(
                "booking API is not configured".to_string(),
            ));
        }

        let url = format!("{}/appointments", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "patient_id": patient_id,
                "starts_at": slot.starts_at,
                "duration_minutes": slot.duration_minutes,
                "appointment_type": slot.appointment_type,
                "provider_id": slot.provider_id,
            }))
            .send()
            .await
            .map_err(|e| {
                error!("Booking request failed: {}", e);
                OfferError::BookingFailed(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OfferError::BookingFailed(format!("{}: {}", status, body)));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OfferError::BookingFailed(e.to_string()))?;

        let appointment_id = body
            .get("appointment_id")
            .and_then(|id| id.as_str())
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(|| {
                OfferError::BookingFailed("booking response had no appointment id".to_string())
            })?;

        info!(
            "Booked appointment {} for patient {} at {}",
            appointment_id, patient_id, slot.starts_at
        );
        Ok(appointment_id)
    }
}
