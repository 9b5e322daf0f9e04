use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{
    acknowledge_alert, get_engine_alerts, get_engine_stats, get_offer, respond_to_offer,
};
use crate::services::engine::WaitlistEngineService;

pub fn create_offer_router(engine: Arc<WaitlistEngineService>) -> Router {
    Router::new()
        .route("/offers/{offer_id}", get(get_offer))
        .route("/offers/{offer_id}/response", post(respond_to_offer))
        .route("/engine/stats", get(get_engine_stats))
        .route("/engine/alerts", get(get_engine_alerts))
        .route("/engine/alerts/{alert_id}/acknowledge", post(acknowledge_alert))
        .with_state(engine)
}
