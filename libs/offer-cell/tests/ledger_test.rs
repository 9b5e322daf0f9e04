// libs/offer-cell/tests/ledger_test.rs
use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use notification_cell::models::Channel;
use offer_cell::models::{Offer, OfferError, OfferOutcome};
use offer_cell::services::ledger::OfferLedgerService;

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 18, 10, 0, 0).unwrap()
}

fn offer_for(cancellation_id: Uuid) -> Offer {
    Offer::new(
        Uuid::new_v4(),
        cancellation_id,
        Uuid::new_v4(),
        Channel::Sms,
        t0(),
        t0(),
        Duration::minutes(120),
    )
}

#[tokio::test]
async fn one_pending_offer_per_slot_is_enforced() {
    let ledger = OfferLedgerService::new();
    let cancellation_id = Uuid::new_v4();

    let first = ledger.open(offer_for(cancellation_id)).await.unwrap();
    let second = ledger.open(offer_for(cancellation_id)).await;

    assert_matches!(second, Err(OfferError::OfferConflict(id)) if id == cancellation_id);
    assert_eq!(
        ledger.pending_for_slot(cancellation_id).await.unwrap().id,
        first.id
    );

    // Closing the first makes room for a successor
    ledger.close(first.id, OfferOutcome::Declined).await.unwrap();
    assert!(ledger.pending_for_slot(cancellation_id).await.is_none());
    ledger.open(offer_for(cancellation_id)).await.unwrap();
}

#[tokio::test]
async fn offers_close_exactly_once() {
    let ledger = OfferLedgerService::new();
    let offer = ledger.open(offer_for(Uuid::new_v4())).await.unwrap();

    ledger.close(offer.id, OfferOutcome::Accepted).await.unwrap();

    let again = ledger.close(offer.id, OfferOutcome::TimedOut).await;
    assert_matches!(again, Err(OfferError::StaleResponse(_)));
    assert_eq!(
        ledger.get(offer.id).await.unwrap().outcome,
        OfferOutcome::Accepted
    );
}

#[tokio::test]
async fn sweep_only_closes_offers_past_their_deadline() {
    let ledger = OfferLedgerService::new();
    let due = ledger.open(offer_for(Uuid::new_v4())).await.unwrap();

    let mut later = offer_for(Uuid::new_v4());
    later.deliver_after = t0() + Duration::hours(5);
    later.expires_at = later.deliver_after + Duration::minutes(120);
    let queued = ledger.open(later).await.unwrap();

    let expired = ledger.sweep_expired(t0() + Duration::hours(3)).await;

    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, due.id);
    assert_eq!(
        ledger.get(queued.id).await.unwrap().outcome,
        OfferOutcome::Pending
    );
}

#[tokio::test]
async fn mark_sent_rearms_the_deadline_from_the_send_instant() {
    let ledger = OfferLedgerService::new();
    let offer = ledger.open(offer_for(Uuid::new_v4())).await.unwrap();

    let sent_at = t0() + Duration::minutes(30);
    let sent = ledger
        .mark_sent(offer.id, Channel::Email, sent_at, Duration::minutes(120))
        .await
        .unwrap();

    assert_eq!(sent.sent_at, Some(sent_at));
    assert_eq!(sent.expires_at, sent_at + Duration::minutes(120));
    assert_eq!(sent.channel, Channel::Email);
}

#[tokio::test]
async fn due_deliveries_exclude_sent_and_future_offers() {
    let ledger = OfferLedgerService::new();

    let due = ledger.open(offer_for(Uuid::new_v4())).await.unwrap();

    let sent = ledger.open(offer_for(Uuid::new_v4())).await.unwrap();
    ledger
        .mark_sent(sent.id, Channel::Sms, t0(), Duration::minutes(120))
        .await
        .unwrap();

    let mut future = offer_for(Uuid::new_v4());
    future.deliver_after = t0() + Duration::hours(8);
    future.expires_at = future.deliver_after + Duration::minutes(120);
    ledger.open(future).await.unwrap();

    let deliveries = ledger.due_deliveries(t0() + Duration::minutes(5)).await;
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].id, due.id);
}
