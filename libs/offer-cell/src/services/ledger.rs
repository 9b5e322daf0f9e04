// libs/offer-cell/src/services/ledger.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::models::Channel;

use crate::models::{Offer, OfferError, OfferOutcome, OfferStats};

struct LedgerInner {
    offers: HashMap<Uuid, Offer>,
    /// The single pending offer per cancellation. Guarded together with the
    /// offer map so the at-most-one invariant can never tear.
    pending_by_slot: HashMap<Uuid, Uuid>,
}

/// Exclusive owner of Offer records. Every closure goes through a
/// compare-and-set on the pending outcome, so whichever of a response, a
/// timeout sweep, or a racing duplicate arrives second loses cleanly.
pub struct OfferLedgerService {
    inner: Arc<RwLock<LedgerInner>>,
}

impl OfferLedgerService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(LedgerInner {
                offers: HashMap::new(),
                pending_by_slot: HashMap::new(),
            })),
        }
    }

    /// Record a new pending offer. Rejected when the slot already has one.
    pub async fn open(&self, offer: Offer) -> Result<Offer, OfferError> {
        let mut inner = self.inner.write().await;

        if inner.pending_by_slot.contains_key(&offer.cancellation_id) {
            warn!(
                "Refusing second pending offer for cancellation {}",
                offer.cancellation_id
            );
            return Err(OfferError::OfferConflict(offer.cancellation_id));
        }

        inner.pending_by_slot.insert(offer.cancellation_id, offer.id);
        inner.offers.insert(offer.id, offer.clone());

        info!(
            "Offer {} opened: entry {} for cancellation {} via {}",
            offer.id, offer.waitlist_entry_id, offer.cancellation_id, offer.channel
        );
        Ok(offer)
    }

    pub async fn get(&self, id: Uuid) -> Option<Offer> {
        let inner = self.inner.read().await;
        inner.offers.get(&id).cloned()
    }

    pub async fn pending_for_slot(&self, cancellation_id: Uuid) -> Option<Offer> {
        let inner = self.inner.read().await;
        inner
            .pending_by_slot
            .get(&cancellation_id)
            .and_then(|offer_id| inner.offers.get(offer_id))
            .cloned()
    }

    /// Close a pending offer with a terminal outcome. A second closure
    /// attempt observes `StaleResponse`; once closed, an offer is immutable.
    pub async fn close(&self, id: Uuid, outcome: OfferOutcome) -> Result<Offer, OfferError> {
        let mut inner = self.inner.write().await;
        let offer = inner.offers.get_mut(&id).ok_or(OfferError::OfferNotFound(id))?;

        if offer.outcome.is_terminal() {
            return Err(OfferError::StaleResponse(id));
        }

        offer.outcome = outcome;
        let closed = offer.clone();
        inner.pending_by_slot.remove(&closed.cancellation_id);

        info!("Offer {} closed as {}", id, outcome);
        Ok(closed)
    }

    /// The delivery actually happened: stamp `sent_at`, record the channel
    /// used, and re-arm the response deadline from the send instant.
    pub async fn mark_sent(
        &self,
        id: Uuid,
        channel: Channel,
        now: DateTime<Utc>,
        response_window: Duration,
    ) -> Result<Offer, OfferError> {
        let mut inner = self.inner.write().await;
        let offer = inner.offers.get_mut(&id).ok_or(OfferError::OfferNotFound(id))?;

        if offer.outcome.is_terminal() {
            return Err(OfferError::StaleResponse(id));
        }

        offer.channel = channel;
        offer.sent_at = Some(now);
        offer.expires_at = now + response_window;

        debug!("Offer {} dispatched via {}, expires {}", id, channel, offer.expires_at);
        Ok(offer.clone())
    }

    /// Close every pending offer whose deadline has passed. Fired deadlines
    /// are final: a response arriving afterwards is stale by construction.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<Offer> {
        let mut inner = self.inner.write().await;
        let expired_ids: Vec<Uuid> = inner
            .offers
            .values()
            .filter(|o| o.outcome == OfferOutcome::Pending && o.expires_at <= now)
            .map(|o| o.id)
            .collect();

        let mut expired = Vec::new();
        for id in expired_ids {
            if let Some(offer) = inner.offers.get_mut(&id) {
                offer.outcome = OfferOutcome::TimedOut;
                let closed = offer.clone();
                inner.pending_by_slot.remove(&closed.cancellation_id);
                warn!("Offer {} timed out", id);
                expired.push(closed);
            }
        }

        expired
    }

    /// Deferred offers whose delivery window has arrived.
    pub async fn due_deliveries(&self, now: DateTime<Utc>) -> Vec<Offer> {
        let inner = self.inner.read().await;
        inner
            .offers
            .values()
            .filter(|o| {
                o.outcome == OfferOutcome::Pending
                    && o.sent_at.is_none()
                    && o.deliver_after <= now
            })
            .cloned()
            .collect()
    }

    pub async fn stats(&self) -> OfferStats {
        let inner = self.inner.read().await;
        let mut stats = OfferStats {
            pending: 0,
            deferred: 0,
            accepted: 0,
            declined: 0,
            timed_out: 0,
            total: inner.offers.len() as u64,
        };

        for offer in inner.offers.values() {
            match offer.outcome {
                OfferOutcome::Pending => {
                    stats.pending += 1;
                    if offer.is_deferred() {
                        stats.deferred += 1;
                    }
                }
                OfferOutcome::Accepted => stats.accepted += 1,
                OfferOutcome::Declined => stats.declined += 1,
                OfferOutcome::TimedOut => stats.timed_out += 1,
            }
        }

        stats
    }
}

impl Default for OfferLedgerService {
    fn default() -> Self {
        Self::new()
    }
}
