use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use cancellation_cell::{create_cancellation_router, CancellationFeedService};
use notification_cell::{create_preference_router, PreferenceStoreService};
use offer_cell::{create_offer_router, WaitlistEngineService};
use waitlist_cell::{create_waitlist_router, WaitlistStoreService};

pub fn create_router(
    waitlist: Arc<WaitlistStoreService>,
    feed: Arc<CancellationFeedService>,
    preferences: Arc<PreferenceStoreService>,
    engine: Arc<WaitlistEngineService>,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Careline waitlist engine is running!" }))
        .nest("/waitlist", create_waitlist_router(waitlist))
        .nest("/cancellations", create_cancellation_router(feed))
        .nest("/preferences", create_preference_router(preferences))
        .merge(create_offer_router(engine))
}
