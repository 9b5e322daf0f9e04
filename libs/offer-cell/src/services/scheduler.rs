// libs/offer-cell/src/services/scheduler.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use cancellation_cell::models::{CancellationEvent, FillStatus, SlotDetails};
use cancellation_cell::services::feed::CancellationFeedService;
use notification_cell::models::{parse_channel_priority, Channel, NotificationError};
use notification_cell::services::dispatch::NotificationDispatch;
use notification_cell::services::preferences::PreferenceStoreService;
use notification_cell::services::windows::{first_open_channel, next_open_time};
use shared_config::AppConfig;
use waitlist_cell::models::{WaitlistEntry, WaitlistError};
use waitlist_cell::services::store::WaitlistStoreService;

use crate::models::{Offer, OfferError};
use crate::services::ledger::OfferLedgerService;

/// Creates offers and carries them to the recipient. Channel choice honors
/// the configured priority order, quiet hours and active days; an offer with
/// no legal window right now is queued for the next one instead of dropped.
pub struct OfferSchedulerService {
    ledger: Arc<OfferLedgerService>,
    waitlist: Arc<WaitlistStoreService>,
    feed: Arc<CancellationFeedService>,
    preferences: Arc<PreferenceStoreService>,
    dispatch: Arc<dyn NotificationDispatch>,
    channel_priority: Vec<Channel>,
    response_window: Duration,
    max_contact_attempts: u32,
}

impl OfferSchedulerService {
    pub fn new(
        config: &AppConfig,
        ledger: Arc<OfferLedgerService>,
        waitlist: Arc<WaitlistStoreService>,
        feed: Arc<CancellationFeedService>,
        preferences: Arc<PreferenceStoreService>,
        dispatch: Arc<dyn NotificationDispatch>,
    ) -> Self {
        Self {
            ledger,
            waitlist,
            feed,
            preferences,
            dispatch,
            channel_priority: parse_channel_priority(&config.channel_priority),
            response_window: Duration::minutes(config.response_window_minutes),
            max_contact_attempts: config.max_contact_attempts,
        }
    }

    /// Offer the freed slot to the chosen entry. On success the entry is
    /// `offered` with its attempt counted, the slot is `offer_pending`, and
    /// the notification is either on its way or queued for the next legal
    /// delivery window.
    pub async fn offer(
        &self,
        entry: &WaitlistEntry,
        slot: &CancellationEvent,
        now: DateTime<Utc>,
    ) -> Result<Offer, OfferError> {
        let preference = self.preferences.get_or_default(entry.patient_id).await;

        // Resolve the delivery plan before touching any state, so an
        // unreachable recipient costs the entry nothing.
        let (channel, deliver_after) =
            match first_open_channel(&preference, &self.channel_priority, now) {
                Some(channel) => (channel, now),
                None => {
                    let next = next_open_time(&preference, &self.channel_priority, now)
                        .ok_or(NotificationError::NoDeliverableChannel)?;
                    let channel = self
                        .channel_priority
                        .iter()
                        .copied()
                        .find(|c| preference.channel_enabled(*c))
                        .ok_or(NotificationError::NoDeliverableChannel)?;
                    debug!(
                        "No legal delivery window for patient {} right now, queuing until {}",
                        entry.patient_id, next
                    );
                    (channel, next)
                }
            };

        let entry = self
            .waitlist
            .try_mark_offered(entry.id, now, self.max_contact_attempts)
            .await?;

        if let Err(e) = self
            .feed
            .compare_and_set_fill_status(slot.id, FillStatus::Open, FillStatus::OfferPending)
            .await
        {
            warn!("Slot {} left the open state mid-offer: {}", slot.id, e);
            self.rollback_entry(entry.id, now).await;
            return Err(e.into());
        }

        let offer = Offer::new(
            entry.id,
            slot.id,
            entry.patient_id,
            channel,
            now,
            deliver_after,
            self.response_window,
        );

        let offer = match self.ledger.open(offer).await {
            Ok(offer) => offer,
            Err(e) => {
                warn!("Ledger refused offer for slot {}: {}", slot.id, e);
                let _ = self.feed.reopen(slot.id).await;
                self.rollback_entry(entry.id, now).await;
                return Err(e);
            }
        };

        if offer.deliver_after <= now {
            // Delivery failures keep the offer pending; the sweep retries
            // until the response window runs out.
            if let Err(e) = self.try_dispatch(offer.id, now).await {
                warn!("Initial dispatch of offer {} failed: {}", offer.id, e);
            }
        } else {
            info!(
                "Offer {} queued for delivery at {} (quiet hours)",
                offer.id, offer.deliver_after
            );
        }

        self.ledger
            .get(offer.id)
            .await
            .ok_or(OfferError::OfferNotFound(offer.id))
    }

    /// Deliver a pending, not-yet-sent offer if a channel is open right now.
    /// Re-picks the channel at delivery time since the legal set may have
    /// changed while the offer sat queued.
    pub async fn try_dispatch(&self, offer_id: Uuid, now: DateTime<Utc>) -> Result<Offer, OfferError> {
        let offer = self
            .ledger
            .get(offer_id)
            .await
            .ok_or(OfferError::OfferNotFound(offer_id))?;

        if offer.outcome.is_terminal() || offer.sent_at.is_some() {
            return Ok(offer);
        }

        let preference = self.preferences.get_or_default(offer.patient_id).await;
        let channel = match first_open_channel(&preference, &self.channel_priority, now) {
            Some(channel) => channel,
            None => {
                debug!("Offer {} still has no open channel, staying queued", offer.id);
                return Ok(offer);
            }
        };

        let slot = self
            .feed
            .get(offer.cancellation_id)
            .await
            .ok_or(OfferError::OfferNotFound(offer.id))?;
        let message = offer_message(&slot.original_slot, self.response_window);

        self.dispatch
            .send(channel, &preference.contact, &message)
            .await?;

        let offer = self
            .ledger
            .mark_sent(offer.id, channel, now, self.response_window)
            .await?;

        if let Err(e) = self.waitlist.mark_contacted(offer.waitlist_entry_id).await {
            // The entry may already have moved on (e.g. a concurrent close);
            // the offer record remains authoritative.
            debug!(
                "Could not mark entry {} contacted: {}",
                offer.waitlist_entry_id, e
            );
        }

        info!("Offer {} delivered via {}", offer.id, channel);
        Ok(offer)
    }

    async fn rollback_entry(&self, entry_id: Uuid, now: DateTime<Utc>) {
        if let Err(e) = self
            .waitlist
            .release_offer(entry_id, self.max_contact_attempts, false, now)
            .await
        {
            match e {
                WaitlistError::StatusConflict { .. } => {}
                other => warn!("Failed to roll back entry {}: {}", entry_id, other),
            }
        }
    }
}

fn offer_message(slot: &SlotDetails, response_window: Duration) -> String {
    format!(
        "An earlier {} appointment on {} has opened up. Reply ACCEPT or DECLINE within {} minutes to claim it.",
        slot.appointment_type,
        slot.starts_at.format("%B %-d at %H:%M"),
        response_window.num_minutes()
    )
}
