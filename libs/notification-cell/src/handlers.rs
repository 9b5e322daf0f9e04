use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{NotificationError, UpsertPreferenceRequest};
use crate::services::preferences::PreferenceStoreService;

/// Save a patient's notification preferences
pub async fn upsert_preferences(
    State(store): State<Arc<PreferenceStoreService>>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpsertPreferenceRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Preference update for patient {}", patient_id);

    let preference = store
        .upsert(patient_id, request)
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "preference": preference
    })))
}

/// Get a patient's notification preferences (defaults if never saved)
pub async fn get_preferences(
    State(store): State<Arc<PreferenceStoreService>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let preference = store.get_or_default(patient_id).await;

    Ok(Json(json!({ "preference": preference })))
}

fn map_error(error: NotificationError) -> AppError {
    match error {
        NotificationError::ValidationError(msg) | NotificationError::InvalidContact(msg) => {
            AppError::ValidationError(msg)
        }
        NotificationError::NoDeliverableChannel => AppError::Conflict(error.to_string()),
        NotificationError::GatewayError(_) | NotificationError::DeliveryRejected(_) => {
            AppError::ExternalService(error.to_string())
        }
    }
}
