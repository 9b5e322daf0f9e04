// libs/cancellation-cell/src/services/feed.rs
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    CancellationError, CancellationEvent, CancellationStats, FillStatus,
    NotifyCancellationRequest,
};

struct FeedInner {
    events: HashMap<Uuid, CancellationEvent>,
    /// Arrival log. Matching consumes open events in this order so earlier
    /// cancellations get first pick of a contested pool.
    arrivals: VecDeque<Uuid>,
}

/// In-memory cancellation feed. One lock guards both the event map and the
/// arrival log so ordered reads see a consistent snapshot.
pub struct CancellationFeedService {
    inner: Arc<RwLock<FeedInner>>,
}

impl CancellationFeedService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(FeedInner {
                events: HashMap::new(),
                arrivals: VecDeque::new(),
            })),
        }
    }

    pub async fn enqueue(
        &self,
        request: NotifyCancellationRequest,
        now: DateTime<Utc>,
    ) -> Result<CancellationEvent, CancellationError> {
        if request.original_slot.duration_minutes <= 0 {
            return Err(CancellationError::ValidationError(
                "slot duration must be positive".to_string(),
            ));
        }

        let event = CancellationEvent {
            id: Uuid::new_v4(),
            appointment_id: request.appointment_id,
            original_slot: request.original_slot,
            cancelled_at: now,
            reason: request.reason,
            fill_status: FillStatus::Open,
        };

        let mut inner = self.inner.write().await;
        inner.arrivals.push_back(event.id);
        inner.events.insert(event.id, event.clone());

        info!(
            "Cancellation {} enqueued for appointment {} ({})",
            event.id, event.appointment_id, event.reason
        );
        Ok(event)
    }

    pub async fn get(&self, id: Uuid) -> Option<CancellationEvent> {
        let inner = self.inner.read().await;
        inner.events.get(&id).cloned()
    }

    /// Open events in arrival order.
    pub async fn open_events(&self) -> Vec<CancellationEvent> {
        let inner = self.inner.read().await;
        inner
            .arrivals
            .iter()
            .filter_map(|id| inner.events.get(id))
            .filter(|e| e.fill_status == FillStatus::Open)
            .cloned()
            .collect()
    }

    /// Compare-and-set on fill status. Fails with `StatusConflict` when the
    /// observed status differs from `expected`, so a racing writer loses
    /// cleanly instead of clobbering.
    pub async fn compare_and_set_fill_status(
        &self,
        id: Uuid,
        expected: FillStatus,
        target: FillStatus,
    ) -> Result<CancellationEvent, CancellationError> {
        let mut inner = self.inner.write().await;
        let event = inner
            .events
            .get_mut(&id)
            .ok_or(CancellationError::NotFound(id))?;

        if event.fill_status != expected {
            return Err(CancellationError::StatusConflict {
                event_id: id,
                expected,
                found: event.fill_status,
            });
        }

        if !event.fill_status.can_transition_to(&target) {
            warn!(
                "Invalid fill status transition attempted: {} -> {} for cancellation {}",
                event.fill_status, target, id
            );
            return Err(CancellationError::InvalidStatusTransition {
                from: event.fill_status,
                to: target,
            });
        }

        event.fill_status = target;
        debug!("Cancellation {} moved from {} to {}", id, expected, target);
        Ok(event.clone())
    }

    pub async fn mark_filled(&self, id: Uuid) -> Result<CancellationEvent, CancellationError> {
        self.compare_and_set_fill_status(id, FillStatus::OfferPending, FillStatus::Filled)
            .await
    }

    /// An outstanding offer closed without acceptance; the slot goes back to
    /// the open pool.
    pub async fn reopen(&self, id: Uuid) -> Result<CancellationEvent, CancellationError> {
        self.compare_and_set_fill_status(id, FillStatus::OfferPending, FillStatus::Open)
            .await
    }

    /// Finalize open slots whose overall fill window has elapsed and prune
    /// terminal events from the arrival log.
    pub async fn expire_overdue(
        &self,
        now: DateTime<Utc>,
        fill_window: Duration,
    ) -> Vec<CancellationEvent> {
        let mut inner = self.inner.write().await;
        let mut expired = Vec::new();

        let cutoff_ids: Vec<Uuid> = inner
            .events
            .values()
            .filter(|e| e.fill_status == FillStatus::Open && e.cancelled_at + fill_window <= now)
            .map(|e| e.id)
            .collect();

        for id in cutoff_ids {
            if let Some(event) = inner.events.get_mut(&id) {
                event.fill_status = FillStatus::UnfilledExpired;
                warn!(
                    "Cancellation {} expired unfilled after {} hours",
                    id,
                    fill_window.num_hours()
                );
                expired.push(event.clone());
            }
        }

        let events = &inner.events;
        let retained: VecDeque<Uuid> = inner
            .arrivals
            .iter()
            .filter(|id| {
                events
                    .get(*id)
                    .map(|e| !e.fill_status.is_terminal())
                    .unwrap_or(false)
            })
            .copied()
            .collect();
        inner.arrivals = retained;

        expired
    }

    pub async fn stats(&self) -> CancellationStats {
        let inner = self.inner.read().await;
        let mut stats = CancellationStats {
            open: 0,
            offer_pending: 0,
            filled: 0,
            unfilled_expired: 0,
            total: inner.events.len() as u64,
        };

        for event in inner.events.values() {
            match event.fill_status {
                FillStatus::Open => stats.open += 1,
                FillStatus::OfferPending => stats.offer_pending += 1,
                FillStatus::Filled => stats.filled += 1,
                FillStatus::UnfilledExpired => stats.unfilled_expired += 1,
            }
        }

        stats
    }
}

impl Default for CancellationFeedService {
    fn default() -> Self {
        Self::new()
    }
}
