// =====================================================================================
// ALERT MANAGER SERVICE
// =====================================================================================

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{Alert, AlertSeverity};

#[derive(Clone, Default)]
pub struct AlertManagerService {
    active_alerts: Arc<RwLock<HashMap<String, Alert>>>,
}

impl AlertManagerService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn raise(
        &self,
        severity: AlertSeverity,
        component: &str,
        title: &str,
        description: String,
        patient_id: Option<&str>,
        tags: &[(&str, String)],
    ) -> Alert {
        let alert = Alert {
            alert_id: Uuid::new_v4().to_string(),
            severity,
            title: title.to_string(),
            description,
            component: component.to_string(),
            patient_id: patient_id.map(str::to_string),
            timestamp: chrono::Utc::now(),
            tags: tags
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
        };

        match alert.severity {
            AlertSeverity::Critical => {
                error!(
                    alert_id = %alert.alert_id,
                    component = %alert.component,
                    patient_id = ?alert.patient_id,
                    "CRITICAL ALERT TRIGGERED: {}: {}", alert.title, alert.description
                );
            }
            AlertSeverity::Warning => {
                warn!(
                    alert_id = %alert.alert_id,
                    component = %alert.component,
                    patient_id = ?alert.patient_id,
                    "WARNING ALERT: {}: {}", alert.title, alert.description
                );
            }
            AlertSeverity::Info => {
                info!(alert_id = %alert.alert_id, "INFO ALERT: {}", alert.title);
            }
        }

        let mut active_alerts = self.active_alerts.write().await;
        active_alerts.insert(alert.alert_id.clone(), alert.clone());
        alert
    }

    pub async fn get_active_alerts(&self) -> Vec<Alert> {
        let alerts = self.active_alerts.read().await;
        let mut list: Vec<Alert> = alerts.values().cloned().collect();
        list.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        list
    }

    pub async fn acknowledge_alert(&self, alert_id: &str) -> bool {
        let mut alerts = self.active_alerts.write().await;
        alerts.remove(alert_id).is_some()
    }

    pub async fn get_alert_summary(&self) -> HashMap<String, u32> {
        let alerts = self.active_alerts.read().await;
        let mut summary = HashMap::new();

        for alert in alerts.values() {
            let severity_key = format!("{:?}", alert.severity);
            *summary.entry(severity_key).or_insert(0) += 1;
        }

        summary
    }
}
