use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers::{get_preferences, upsert_preferences};
use crate::services::preferences::PreferenceStoreService;

pub fn create_preference_router(store: Arc<PreferenceStoreService>) -> Router {
    Router::new()
        .route("/{patient_id}", get(get_preferences).put(upsert_preferences))
        .with_state(store)
}
