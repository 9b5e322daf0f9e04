// libs/offer-cell/src/services/alerts.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{AlertSeverity, OperatorAlert};

/// In-memory operator alert log. Every dropped slot or unreachable candidate
/// leaves a trace here for the surrounding dashboard/alerting system.
pub struct OperatorAlertService {
    active_alerts: Arc<RwLock<HashMap<Uuid, OperatorAlert>>>,
}

impl OperatorAlertService {
    pub fn new() -> Self {
        Self {
            active_alerts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn raise(&self, severity: AlertSeverity, title: &str, detail: String) {
        let alert = OperatorAlert {
            alert_id: Uuid::new_v4(),
            severity,
            title: title.to_string(),
            detail,
            raised_at: chrono::Utc::now(),
        };

        match severity {
            AlertSeverity::Critical => {
                error!(alert_id = %alert.alert_id, "ALERT: {}: {}", alert.title, alert.detail);
            }
            AlertSeverity::Warning => {
                warn!(alert_id = %alert.alert_id, "ALERT: {}: {}", alert.title, alert.detail);
            }
            AlertSeverity::Info => {
                info!(alert_id = %alert.alert_id, "ALERT: {}: {}", alert.title, alert.detail);
            }
        }

        let mut alerts = self.active_alerts.write().await;
        alerts.insert(alert.alert_id, alert);
    }

    pub async fn list(&self) -> Vec<OperatorAlert> {
        let alerts = self.active_alerts.read().await;
        let mut listed: Vec<OperatorAlert> = alerts.values().cloned().collect();
        listed.sort_by(|a, b| b.raised_at.cmp(&a.raised_at));
        listed
    }

    pub async fn acknowledge(&self, alert_id: Uuid) -> bool {
        let mut alerts = self.active_alerts.write().await;
        alerts.remove(&alert_id).is_some()
    }
}

impl Default for OperatorAlertService {
    fn default() -> Self {
        Self::new()
    }
}
