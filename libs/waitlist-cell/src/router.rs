use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{
    add_waitlist_entry, get_waitlist_entry, get_waitlist_stats, list_waitlist,
    remove_waitlist_entry,
};
use crate::services::store::WaitlistStoreService;

pub fn create_waitlist_router(store: Arc<WaitlistStoreService>) -> Router {
    Router::new()
        .route("/", post(add_waitlist_entry).get(list_waitlist))
        .route("/stats", get(get_waitlist_stats))
        .route("/{entry_id}", get(get_waitlist_entry).delete(remove_waitlist_entry))
        .with_state(store)
}
