// libs/offer-cell/src/services/engine.rs
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::time::interval;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use cancellation_cell::models::{CancellationError, FillStatus};
use cancellation_cell::services::feed::CancellationFeedService;
use matching_cell::services::matcher::MatcherService;
use notification_cell::models::NotificationError;
use shared_config::AppConfig;
use waitlist_cell::models::{WaitlistError, WaitlistStatus};
use waitlist_cell::services::store::WaitlistStoreService;

use crate::models::{
    AlertSeverity, EngineStats, Offer, OfferError, OfferOutcome, OperatorAlert,
    RespondedOutcome, SweepReport,
};
use crate::services::alerts::OperatorAlertService;
use crate::services::booking::AppointmentBooking;
use crate::services::ledger::OfferLedgerService;
use crate::services::scheduler::OfferSchedulerService;

/// Orchestrates the full cancellation-fill flow: open slots are matched in
/// arrival order, each behind its own lock so a slot is never double-offered;
/// responses and timeouts close offers and trigger re-matching; overdue
/// slots and deferred deliveries are handled by the background sweep.
pub struct WaitlistEngineService {
    waitlist: Arc<WaitlistStoreService>,
    feed: Arc<CancellationFeedService>,
    ledger: Arc<OfferLedgerService>,
    scheduler: Arc<OfferSchedulerService>,
    matcher: Arc<MatcherService>,
    booking: Arc<dyn AppointmentBooking>,
    alerts: Arc<OperatorAlertService>,
    /// One mutex per cancellation serializes its match/offer pairing.
    slot_locks: Arc<RwLock<HashMap<Uuid, Arc<Mutex<()>>>>>,
    /// Entries already offered (or proven unreachable) per slot; never
    /// re-offered the same slot.
    offered_history: Arc<RwLock<HashMap<Uuid, HashSet<Uuid>>>>,
    overall_fill_window: Duration,
    max_contact_attempts: u32,
    match_interval_seconds: u64,
    expiry_sweep_interval_seconds: u64,
    is_running: RwLock<bool>,
}

impl WaitlistEngineService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &AppConfig,
        waitlist: Arc<WaitlistStoreService>,
        feed: Arc<CancellationFeedService>,
        ledger: Arc<OfferLedgerService>,
        scheduler: Arc<OfferSchedulerService>,
        matcher: Arc<MatcherService>,
        booking: Arc<dyn AppointmentBooking>,
        alerts: Arc<OperatorAlertService>,
    ) -> Self {
        Self {
            waitlist,
            feed,
            ledger,
            scheduler,
            matcher,
            booking,
            alerts,
            slot_locks: Arc::new(RwLock::new(HashMap::new())),
            offered_history: Arc::new(RwLock::new(HashMap::new())),
            overall_fill_window: Duration::hours(config.overall_fill_window_hours),
            max_contact_attempts: config.max_contact_attempts,
            match_interval_seconds: config.match_interval_seconds,
            expiry_sweep_interval_seconds: config.expiry_sweep_interval_seconds,
            is_running: RwLock::new(false),
        }
    }

    // ==========================================================================
    // MATCHING
    // ==========================================================================

    /// Match one open slot and place an offer. Serialized per slot, so two
    /// concurrent fill attempts for the same cancellation can never both
    /// offer it. Returns `Ok(None)` when the slot is no longer open or no
    /// eligible candidate remains; the slot then stays open for later passes
    /// until its fill window elapses.
    pub async fn process_slot(
        &self,
        cancellation_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Offer>, OfferError> {
        let lock = self.slot_lock(cancellation_id).await;
        let _guard = lock.lock().await;

        let slot = self
            .feed
            .get(cancellation_id)
            .await
            .ok_or(CancellationError::NotFound(cancellation_id))?;

        if slot.fill_status != FillStatus::Open {
            debug!("Slot {} is {}, nothing to match", cancellation_id, slot.fill_status);
            return Ok(None);
        }

        let mut excluded = self.offered_entries(cancellation_id).await;

        loop {
            let pool = self
                .waitlist
                .find_eligible(
                    &slot.original_slot.appointment_type,
                    slot.original_slot.provider_id,
                )
                .await;

            let candidate = match self.matcher.match_slot(&slot, &pool, &excluded, now) {
                Some(candidate) => candidate,
                None => {
                    debug!(
                        "No eligible candidates for slot {} (pool of {}, {} excluded)",
                        cancellation_id,
                        pool.len(),
                        excluded.len()
                    );
                    return Ok(None);
                }
            };

            let entry_id = candidate.entry.id;
            match self.scheduler.offer(&candidate.entry, &slot, now).await {
                Ok(offer) => {
                    self.record_offered(cancellation_id, entry_id).await;
                    info!(
                        "Slot {} offered to entry {} (score {:.2}: {})",
                        cancellation_id,
                        entry_id,
                        candidate.score,
                        candidate.match_reasons.join(", ")
                    );
                    return Ok(Some(offer));
                }
                Err(OfferError::Waitlist(WaitlistError::StatusConflict { .. })) => {
                    // Another slot claimed this entry between snapshot and
                    // CAS; rescore the remaining pool.
                    debug!(
                        "Entry {} was claimed by a concurrent slot, rescoring",
                        entry_id
                    );
                    excluded.insert(entry_id);
                }
                Err(OfferError::Waitlist(WaitlistError::ContactAttemptsExhausted {
                    entry_id,
                    max_attempts,
                })) => {
                    self.alerts
                        .raise(
                            AlertSeverity::Warning,
                            "Waitlist entry exhausted",
                            format!(
                                "Entry {} reached {} contact attempts and expired",
                                entry_id, max_attempts
                            ),
                        )
                        .await;
                    excluded.insert(entry_id);
                }
                Err(OfferError::Notification(NotificationError::NoDeliverableChannel)) => {
                    self.alerts
                        .raise(
                            AlertSeverity::Warning,
                            "Patient unreachable",
                            format!(
                                "Entry {} has no deliverable notification channel; skipped for slot {}",
                                entry_id, cancellation_id
                            ),
                        )
                        .await;
                    // Remember the failure for this slot so later passes do
                    // not retry an unreachable recipient.
                    self.record_offered(cancellation_id, entry_id).await;
                    excluded.insert(entry_id);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One pass over the open feed in arrival order.
    pub async fn run_match_pass(&self, now: DateTime<Utc>) -> usize {
        let mut offers_made = 0;
        for event in self.feed.open_events().await {
            match self.process_slot(event.id, now).await {
                Ok(Some(_)) => offers_made += 1,
                Ok(None) => {}
                Err(e) => warn!("Matching slot {} failed: {}", event.id, e),
            }
        }
        offers_made
    }

    // ==========================================================================
    // RESPONSE HANDLING
    // ==========================================================================

    /// Apply a recipient's accept/decline. Responses to closed or expired
    /// offers are rejected and never applied retroactively.
    #[instrument(skip(self))]
    pub async fn record_response(
        &self,
        offer_id: Uuid,
        outcome: RespondedOutcome,
        now: DateTime<Utc>,
    ) -> Result<Offer, OfferError> {
        let offer = self
            .ledger
            .get(offer_id)
            .await
            .ok_or(OfferError::OfferNotFound(offer_id))?;

        if offer.outcome.is_terminal() {
            warn!("Ignoring response to closed offer {}", offer_id);
            return Err(OfferError::StaleResponse(offer_id));
        }

        if offer.expires_at <= now {
            // The deadline fired even if the sweep has not run yet; close it
            // as timed out and reject the late response.
            self.finalize_timeout(&offer, now).await;
            return Err(OfferError::StaleResponse(offer_id));
        }

        match outcome {
            RespondedOutcome::Accepted => self.apply_acceptance(offer_id).await,
            RespondedOutcome::Declined => self.apply_decline(offer_id, now).await,
        }
    }

    async fn apply_acceptance(&self, offer_id: Uuid) -> Result<Offer, OfferError> {
        let offer = self.ledger.close(offer_id, OfferOutcome::Accepted).await?;

        let slot = self
            .feed
            .get(offer.cancellation_id)
            .await
            .ok_or(OfferError::OfferNotFound(offer_id))?;

        self.waitlist.mark_scheduled(offer.waitlist_entry_id).await?;
        self.feed.mark_filled(offer.cancellation_id).await?;

        match self
            .booking
            .book_appointment(offer.patient_id, &slot.original_slot)
            .await
        {
            Ok(appointment_id) => {
                info!(
                    "Offer {} accepted; appointment {} booked for patient {}",
                    offer_id, appointment_id, offer.patient_id
                );
            }
            Err(e) => {
                // The slot is committed to this patient; a booking outage is
                // an operator problem, not a reason to re-offer the slot.
                self.alerts
                    .raise(
                        AlertSeverity::Critical,
                        "Booking failed after acceptance",
                        format!(
                            "Offer {} accepted by patient {} but booking failed: {}",
                            offer_id, offer.patient_id, e
                        ),
                    )
                    .await;
                return Err(e);
            }
        }

        Ok(offer)
    }

    async fn apply_decline(&self, offer_id: Uuid, now: DateTime<Utc>) -> Result<Offer, OfferError> {
        let offer = self.ledger.close(offer_id, OfferOutcome::Declined).await?;

        let released = self
            .waitlist
            .release_offer(offer.waitlist_entry_id, self.max_contact_attempts, true, now)
            .await?;
        if released.status == WaitlistStatus::Expired {
            self.alerts
                .raise(
                    AlertSeverity::Warning,
                    "Waitlist entry exhausted",
                    format!(
                        "Entry {} declined its final offer and expired",
                        released.id
                    ),
                )
                .await;
        }

        self.feed.reopen(offer.cancellation_id).await?;
        info!(
            "Offer {} declined by entry {}, re-matching slot {}",
            offer_id, offer.waitlist_entry_id, offer.cancellation_id
        );

        // The decliner is already in this slot's offered history, so the
        // re-match goes to the next candidate.
        self.process_slot(offer.cancellation_id, now).await?;
        Ok(offer)
    }

    async fn finalize_timeout(&self, offer: &Offer, now: DateTime<Utc>) {
        match self.ledger.close(offer.id, OfferOutcome::TimedOut).await {
            Ok(closed) => self.release_after_timeout(&closed, now).await,
            Err(e) => debug!("Offer {} already closed during timeout: {}", offer.id, e),
        }
    }

    async fn release_after_timeout(&self, offer: &Offer, now: DateTime<Utc>) {
        match self
            .waitlist
            .release_offer(offer.waitlist_entry_id, self.max_contact_attempts, false, now)
            .await
        {
            Ok(released) if released.status == WaitlistStatus::Expired => {
                self.alerts
                    .raise(
                        AlertSeverity::Warning,
                        "Waitlist entry exhausted",
                        format!(
                            "Entry {} timed out on its final offer and expired",
                            released.id
                        ),
                    )
                    .await;
            }
            Ok(_) => {}
            Err(e) => warn!(
                "Could not release entry {} after timeout: {}",
                offer.waitlist_entry_id, e
            ),
        }

        if let Err(e) = self.feed.reopen(offer.cancellation_id).await {
            debug!(
                "Slot {} not reopened after timeout: {}",
                offer.cancellation_id, e
            );
        }
    }

    // ==========================================================================
    // BACKGROUND SWEEPS
    // ==========================================================================

    /// Close expired offers, deliver queued offers whose window arrived, and
    /// finalize slots whose overall fill window elapsed.
    pub async fn run_expiry_sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let timed_out = self.ledger.sweep_expired(now).await;
        for offer in &timed_out {
            self.release_after_timeout(offer, now).await;
        }

        let mut delivered = 0;
        for offer in self.ledger.due_deliveries(now).await {
            match self.scheduler.try_dispatch(offer.id, now).await {
                Ok(updated) if updated.sent_at.is_some() => delivered += 1,
                Ok(_) => {}
                Err(e) => warn!("Deferred delivery of offer {} failed: {}", offer.id, e),
            }
        }

        let expired_slots = self
            .feed
            .expire_overdue(now, self.overall_fill_window)
            .await;
        for event in &expired_slots {
            self.alerts
                .raise(
                    AlertSeverity::Warning,
                    "Slot expired unfilled",
                    format!(
                        "Cancellation {} found no taker within {} hours",
                        event.id,
                        self.overall_fill_window.num_hours()
                    ),
                )
                .await;
        }

        self.prune_slot_state().await;

        SweepReport {
            offers_timed_out: timed_out.len(),
            deferred_deliveries: delivered,
            slots_expired: expired_slots.len(),
        }
    }

    /// Drop per-slot bookkeeping for terminal or vanished cancellations.
    async fn prune_slot_state(&self) {
        let tracked: Vec<Uuid> = {
            let history = self.offered_history.read().await;
            history.keys().copied().collect()
        };

        for id in tracked {
            let terminal = match self.feed.get(id).await {
                Some(event) => event.fill_status.is_terminal(),
                None => true,
            };
            if terminal {
                self.offered_history.write().await.remove(&id);
                self.slot_locks.write().await.remove(&id);
            }
        }
    }

    // ==========================================================================
    // LIFECYCLE
    // ==========================================================================

    pub async fn start(self: Arc<Self>) -> Result<(), OfferError> {
        {
            let mut running = self.is_running.write().await;
            if *running {
                warn!("Waitlist engine is already running");
                return Ok(());
            }
            *running = true;
        }

        info!(
            "Starting waitlist engine (match every {}s, sweep every {}s)",
            self.match_interval_seconds, self.expiry_sweep_interval_seconds
        );

        let mut handles = Vec::new();

        let match_engine = Arc::clone(&self);
        handles.push(tokio::spawn(async move { match_engine.match_loop().await }));

        let sweep_engine = Arc::clone(&self);
        handles.push(tokio::spawn(async move { sweep_engine.sweep_loop().await }));

        tokio::select! {
            _ = futures::future::try_join_all(handles) => {
                warn!("Engine loops completed unexpectedly");
            }
            _ = self.wait_for_shutdown() => {
                info!("Shutdown signal received, stopping waitlist engine");
            }
        }

        Ok(())
    }

    pub async fn shutdown(&self) {
        let mut running = self.is_running.write().await;
        *running = false;
        info!("Waitlist engine shutdown requested");
    }

    async fn match_loop(&self) {
        let mut tick = interval(tokio::time::Duration::from_secs(self.match_interval_seconds));
        loop {
            tick.tick().await;
            if !*self.is_running.read().await {
                debug!("Match loop stopping due to shutdown");
                break;
            }
            let offers = self.run_match_pass(Utc::now()).await;
            if offers > 0 {
                debug!("Match pass placed {} offer(s)", offers);
            }
        }
    }

    async fn sweep_loop(&self) {
        let mut tick = interval(tokio::time::Duration::from_secs(
            self.expiry_sweep_interval_seconds,
        ));
        loop {
            tick.tick().await;
            if !*self.is_running.read().await {
                debug!("Sweep loop stopping due to shutdown");
                break;
            }
            let report = self.run_expiry_sweep(Utc::now()).await;
            if report.offers_timed_out > 0 || report.slots_expired > 0 {
                info!(
                    "Sweep: {} offer(s) timed out, {} deferred delivery(ies), {} slot(s) expired",
                    report.offers_timed_out, report.deferred_deliveries, report.slots_expired
                );
            }
        }
    }

    async fn wait_for_shutdown(&self) {
        loop {
            if !*self.is_running.read().await {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }
    }

    // ==========================================================================
    // READ SURFACE
    // ==========================================================================

    pub async fn get_offer(&self, offer_id: Uuid) -> Option<Offer> {
        self.ledger.get(offer_id).await
    }

    pub async fn stats(&self) -> EngineStats {
        EngineStats {
            waitlist: self.waitlist.stats().await,
            cancellations: self.feed.stats().await,
            offers: self.ledger.stats().await,
        }
    }

    pub async fn alerts(&self) -> Vec<OperatorAlert> {
        self.alerts.list().await
    }

    pub async fn acknowledge_alert(&self, alert_id: Uuid) -> bool {
        self.alerts.acknowledge(alert_id).await
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn slot_lock(&self, cancellation_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.slot_locks.write().await;
        locks
            .entry(cancellation_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn offered_entries(&self, cancellation_id: Uuid) -> HashSet<Uuid> {
        let history = self.offered_history.read().await;
        history.get(&cancellation_id).cloned().unwrap_or_default()
    }

    async fn record_offered(&self, cancellation_id: Uuid, entry_id: Uuid) {
        let mut history = self.offered_history.write().await;
        history.entry(cancellation_id).or_default().insert(entry_id);
    }
}
