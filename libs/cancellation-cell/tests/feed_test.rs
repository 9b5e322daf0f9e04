// libs/cancellation-cell/tests/feed_test.rs
use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use cancellation_cell::models::{
    CancellationError, CancellationReason, FillStatus, NotifyCancellationRequest, SlotDetails,
};
use cancellation_cell::services::feed::CancellationFeedService;
use shared_models::appointment::AppointmentType;

fn request() -> NotifyCancellationRequest {
    NotifyCancellationRequest {
        appointment_id: Uuid::new_v4(),
        original_slot: SlotDetails {
            starts_at: Utc.with_ymd_and_hms(2025, 6, 20, 9, 0, 0).unwrap(),
            duration_minutes: 30,
            appointment_type: AppointmentType::Consultation,
            provider_id: Uuid::new_v4(),
            accepted_insurance: vec![],
        },
        reason: CancellationReason::PatientCancelled,
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 18, 10, 0, 0).unwrap()
}

#[tokio::test]
async fn enqueued_events_start_open() {
    let feed = CancellationFeedService::new();

    let event = feed.enqueue(request(), now()).await.unwrap();

    assert_eq!(event.fill_status, FillStatus::Open);
    assert_eq!(feed.get(event.id).await.unwrap().id, event.id);
}

#[tokio::test]
async fn enqueue_rejects_non_positive_duration() {
    let feed = CancellationFeedService::new();
    let mut bad = request();
    bad.original_slot.duration_minutes = 0;

    let result = feed.enqueue(bad, now()).await;
    assert_matches!(result, Err(CancellationError::ValidationError(_)));
}

#[tokio::test]
async fn open_events_preserve_arrival_order() {
    let feed = CancellationFeedService::new();

    let first = feed.enqueue(request(), now()).await.unwrap();
    let second = feed
        .enqueue(request(), now() + Duration::minutes(1))
        .await
        .unwrap();
    let third = feed
        .enqueue(request(), now() + Duration::minutes(2))
        .await
        .unwrap();

    // Taking the middle one out of the open pool keeps the others ordered
    feed.compare_and_set_fill_status(second.id, FillStatus::Open, FillStatus::OfferPending)
        .await
        .unwrap();

    let open: Vec<Uuid> = feed.open_events().await.iter().map(|e| e.id).collect();
    assert_eq!(open, vec![first.id, third.id]);
}

#[tokio::test]
async fn compare_and_set_rejects_unexpected_status() {
    let feed = CancellationFeedService::new();
    let event = feed.enqueue(request(), now()).await.unwrap();

    feed.compare_and_set_fill_status(event.id, FillStatus::Open, FillStatus::OfferPending)
        .await
        .unwrap();

    // A second writer that still believes the slot is open loses
    let result = feed
        .compare_and_set_fill_status(event.id, FillStatus::Open, FillStatus::OfferPending)
        .await;
    assert_matches!(
        result,
        Err(CancellationError::StatusConflict {
            expected: FillStatus::Open,
            found: FillStatus::OfferPending,
            ..
        })
    );
}

#[tokio::test]
async fn filled_slots_cannot_reopen() {
    let feed = CancellationFeedService::new();
    let event = feed.enqueue(request(), now()).await.unwrap();

    feed.compare_and_set_fill_status(event.id, FillStatus::Open, FillStatus::OfferPending)
        .await
        .unwrap();
    feed.mark_filled(event.id).await.unwrap();

    let result = feed.reopen(event.id).await;
    assert_matches!(result, Err(CancellationError::StatusConflict { .. }));
}

#[tokio::test]
async fn expire_overdue_finalizes_only_open_slots_past_the_window() {
    let feed = CancellationFeedService::new();
    let window = Duration::hours(24);

    let stale = feed.enqueue(request(), now()).await.unwrap();
    let fresh = feed
        .enqueue(request(), now() + Duration::hours(20))
        .await
        .unwrap();
    let pending = feed.enqueue(request(), now()).await.unwrap();
    feed.compare_and_set_fill_status(pending.id, FillStatus::Open, FillStatus::OfferPending)
        .await
        .unwrap();

    let expired = feed.expire_overdue(now() + Duration::hours(25), window).await;
    let expired_ids: Vec<Uuid> = expired.iter().map(|e| e.id).collect();

    assert_eq!(expired_ids, vec![stale.id]);
    assert_eq!(
        feed.get(stale.id).await.unwrap().fill_status,
        FillStatus::UnfilledExpired
    );
    assert_eq!(feed.get(fresh.id).await.unwrap().fill_status, FillStatus::Open);
    assert_eq!(
        feed.get(pending.id).await.unwrap().fill_status,
        FillStatus::OfferPending
    );

    // The expired slot left the arrival log
    let open: Vec<Uuid> = feed.open_events().await.iter().map(|e| e.id).collect();
    assert_eq!(open, vec![fresh.id]);
}
