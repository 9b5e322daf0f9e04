use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{OfferError, OfferResponseRequest};
use crate::services::engine::WaitlistEngineService;

/// Record a patient's accept/decline for an outstanding offer
pub async fn respond_to_offer(
    State(engine): State<Arc<WaitlistEngineService>>,
    Path(offer_id): Path<Uuid>,
    Json(request): Json<OfferResponseRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Response {:?} received for offer {}", request.outcome, offer_id);

    let offer = engine
        .record_response(offer_id, request.outcome, Utc::now())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "offer": offer
    })))
}

/// Get an offer by id
pub async fn get_offer(
    State(engine): State<Arc<WaitlistEngineService>>,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    match engine.get_offer(offer_id).await {
        Some(offer) => Ok(Json(json!({ "offer": offer }))),
        None => Err(AppError::NotFound(format!("Offer {} not found", offer_id))),
    }
}

/// Engine-wide fill statistics
pub async fn get_engine_stats(
    State(engine): State<Arc<WaitlistEngineService>>,
) -> Result<Json<Value>, AppError> {
    let stats = engine.stats().await;

    Ok(Json(json!({
        "waitlist": stats.waitlist,
        "cancellations": stats.cancellations,
        "offers": stats.offers
    })))
}

/// Active operator alerts, newest first
pub async fn get_engine_alerts(
    State(engine): State<Arc<WaitlistEngineService>>,
) -> Result<Json<Value>, AppError> {
    let alerts = engine.alerts().await;

    Ok(Json(json!({
        "count": alerts.len(),
        "alerts": alerts
    })))
}

/// Acknowledge (clear) an operator alert
pub async fn acknowledge_alert(
    State(engine): State<Arc<WaitlistEngineService>>,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if engine.acknowledge_alert(alert_id).await {
        Ok(Json(json!({
            "success": true,
            "message": "Alert acknowledged"
        })))
    } else {
        Err(AppError::NotFound(format!("Alert {} not found", alert_id)))
    }
}

fn map_error(error: OfferError) -> AppError {
    match error {
        OfferError::OfferNotFound(id) => AppError::NotFound(format!("Offer {} not found", id)),
        OfferError::StaleResponse(id) => {
            AppError::Gone(format!("Offer {} is already closed", id))
        }
        OfferError::OfferConflict(_) => AppError::Conflict(error.to_string()),
        OfferError::Waitlist(_) | OfferError::Cancellation(_) => {
            AppError::Conflict(error.to_string())
        }
        OfferError::Notification(_) => AppError::ExternalService(error.to_string()),
        OfferError::BookingFailed(_) => AppError::ExternalService(error.to_string()),
    }
}
