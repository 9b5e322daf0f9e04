use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{get_cancellation, get_cancellation_stats, notify_cancellation};
use crate::services::feed::CancellationFeedService;

pub fn create_cancellation_router(feed: Arc<CancellationFeedService>) -> Router {
    Router::new()
        .route("/", post(notify_cancellation))
        .route("/stats", get(get_cancellation_stats))
        .route("/{event_id}", get(get_cancellation))
        .with_state(feed)
}
