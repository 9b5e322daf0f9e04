use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{AddWaitlistEntryRequest, WaitlistEntry, WaitlistError};
use crate::services::store::WaitlistStoreService;

/// Add a patient to the waitlist
pub async fn add_waitlist_entry(
    State(store): State<Arc<WaitlistStoreService>>,
    Json(request): Json<AddWaitlistEntryRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Waitlist add request for patient {}", request.patient_id);

    let entry = store.insert(request, Utc::now()).await.map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "entry": entry_json(&entry)
    })))
}

/// Get a single waitlist entry
pub async fn get_waitlist_entry(
    State(store): State<Arc<WaitlistStoreService>>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    match store.get(entry_id).await {
        Some(entry) => Ok(Json(json!({ "entry": entry_json(&entry) }))),
        None => Err(AppError::NotFound(format!("Waitlist entry {} not found", entry_id))),
    }
}

/// List active (non-terminal) waitlist entries, oldest first
pub async fn list_waitlist(
    State(store): State<Arc<WaitlistStoreService>>,
) -> Result<Json<Value>, AppError> {
    let entries = store.list().await;
    let listed: Vec<Value> = entries.iter().map(entry_json).collect();

    Ok(Json(json!({
        "count": listed.len(),
        "entries": listed
    })))
}

/// Withdraw a waitlist entry
pub async fn remove_waitlist_entry(
    State(store): State<Arc<WaitlistStoreService>>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Waitlist removal request for entry {}", entry_id);

    store.remove(entry_id).await.map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Waitlist entry removed"
    })))
}

/// Waitlist occupancy statistics
pub async fn get_waitlist_stats(
    State(store): State<Arc<WaitlistStoreService>>,
) -> Result<Json<Value>, AppError> {
    let stats = store.stats().await;

    Ok(Json(json!({
        "waiting": stats.waiting,
        "offered": stats.offered,
        "contacted": stats.contacted,
        "scheduled": stats.scheduled,
        "expired": stats.expired,
        "removed": stats.removed,
        "total": stats.total
    })))
}

fn entry_json(entry: &WaitlistEntry) -> Value {
    let mut value = serde_json::to_value(entry).unwrap_or_else(|e| {
        error!("Failed to serialize waitlist entry {}: {}", entry.id, e);
        json!({ "id": entry.id })
    });
    if let Some(object) = value.as_object_mut() {
        object.insert(
            "display_priority".to_string(),
            json!(entry.display_priority(Utc::now())),
        );
    }
    value
}

fn map_error(error: WaitlistError) -> AppError {
    match error {
        WaitlistError::NotFound(id) => AppError::NotFound(format!("Waitlist entry {} not found", id)),
        WaitlistError::ValidationError(msg) => AppError::ValidationError(msg),
        WaitlistError::InvalidStatusTransition { .. } | WaitlistError::StatusConflict { .. } => {
            AppError::Conflict(error.to_string())
        }
        WaitlistError::ContactAttemptsExhausted { .. } => AppError::Conflict(error.to_string()),
    }
}
