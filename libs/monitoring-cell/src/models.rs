// =====================================================================================
// MONITORING MODELS
// =====================================================================================

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub alert_id: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub component: String,
    pub patient_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeAlertRequest {
    pub alert_id: String,
}
