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

use crate::models::{CancellationError, NotifyCancellationRequest};
use crate::services::feed::CancellationFeedService;

/// Ingest a freed slot from the appointment calendar
pub async fn notify_cancellation(
    State(feed): State<Arc<CancellationFeedService>>,
    Json(request): Json<NotifyCancellationRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Cancellation notification for appointment {} ({})",
        request.appointment_id, request.reason
    );

    let event = feed.enqueue(request, Utc::now()).await.map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "event": event
    })))
}

/// Get a cancellation event
pub async fn get_cancellation(
    State(feed): State<Arc<CancellationFeedService>>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    match feed.get(event_id).await {
        Some(event) => Ok(Json(json!({ "event": event }))),
        None => Err(AppError::NotFound(format!(
            "Cancellation event {} not found",
            event_id
        ))),
    }
}

/// Feed fill statistics
pub async fn get_cancellation_stats(
    State(feed): State<Arc<CancellationFeedService>>,
) -> Result<Json<Value>, AppError> {
    let stats = feed.stats().await;

    Ok(Json(json!({
        "open": stats.open,
        "offer_pending": stats.offer_pending,
        "filled": stats.filled,
        "unfilled_expired": stats.unfilled_expired,
        "total": stats.total
    })))
}

fn map_error(error: CancellationError) -> AppError {
    match error {
        CancellationError::NotFound(id) => {
            AppError::NotFound(format!("Cancellation event {} not found", id))
        }
        CancellationError::ValidationError(msg) => AppError::ValidationError(msg),
        CancellationError::InvalidStatusTransition { .. }
        | CancellationError::StatusConflict { .. } => AppError::Conflict(error.to_string()),
    }
}
