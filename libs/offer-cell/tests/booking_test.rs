// libs/offer-cell/tests/booking_test.rs
use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cancellation_cell::models::SlotDetails;
use offer_cell::models::OfferError;
use offer_cell::services::booking::{AppointmentBooking, HttpBookingClient};
use shared_config::AppConfig;
use shared_models::appointment::AppointmentType;

fn slot(provider_id: Uuid) -> SlotDetails {
    SlotDetails {
        starts_at: Utc.with_ymd_and_hms(2025, 6, 20, 9, 30, 0).unwrap(),
        duration_minutes: 30,
        appointment_type: AppointmentType::Consultation,
        provider_id,
        accepted_insurance: vec![],
    }
}

fn client_for(server: &MockServer) -> HttpBookingClient {
    let mut config = AppConfig::default();
    config.booking_api_url = server.uri();
    HttpBookingClient::new(&config)
}

#[tokio::test]
async fn booking_posts_the_slot_and_returns_the_appointment_id() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let provider_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/appointments"))
        .and(body_partial_json(json!({
            "patient_id": patient_id,
            "provider_id": provider_id,
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "appointment_id": appointment_id })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let booked = client_for(&server)
        .book_appointment(patient_id, &slot(provider_id))
        .await
        .unwrap();

    assert_eq!(booked, appointment_id);
}

#[tokio::test]
async fn calendar_rejections_surface_as_booking_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_string("slot already taken"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .book_appointment(Uuid::new_v4(), &slot(Uuid::new_v4()))
        .await;

    assert_matches!(result, Err(OfferError::BookingFailed(_)));
}

#[tokio::test]
async fn a_response_without_an_appointment_id_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .book_appointment(Uuid::new_v4(), &slot(Uuid::new_v4()))
        .await;

    assert_matches!(result, Err(OfferError::BookingFailed(_)));
}

#[tokio::test]
async fn an_unconfigured_booking_api_fails_without_a_request() {
    let client = HttpBookingClient::new(&AppConfig::default());

    let result = client
        .book_appointment(Uuid::new_v4(), &slot(Uuid::new_v4()))
        .await;

    assert_matches!(result, Err(OfferError::BookingFailed(_)));
}
