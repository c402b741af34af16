// Client for the spreadsheet-backed legacy master store.
//
// The store speaks a single-endpoint RPC contract: every request is a JSON
// object with a `type` discriminator, every response an envelope
// `{ok, error?, ...payload}`.
use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::clinic::{CallStatus, ReviewStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LegacyStoreError {
    #[error("Legacy store is not configured")]
    NotConfigured,

    #[error("Legacy store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Legacy store transport error: {0}")]
    Transport(String),

    #[error("Legacy store rejected the request: {0}")]
    Rejected(String),

    #[error("Legacy store returned malformed data: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LegacyOperation {
    Intake {
        patient_id: String,
        display_name: String,
        phone: Option<String>,
        contact_id: Option<String>,
        answers: BTreeMap<String, Value>,
        submitted_at: DateTime<Utc>,
    },
    DoctorUpdate {
        reserve_id: String,
        patient_id: String,
        status: ReviewStatus,
        call_status: CallStatus,
        note: Option<String>,
        menu: Option<String>,
    },
    SaveContactId {
        patient_id: String,
        contact_id: String,
    },
}

impl LegacyOperation {
    pub fn patient_id(&self) -> &str {
        match self {
            LegacyOperation::Intake { patient_id, .. }
            | LegacyOperation::DoctorUpdate { patient_id, .. }
            | LegacyOperation::SaveContactId { patient_id, .. } => patient_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LegacyOperation::Intake { .. } => "intake",
            LegacyOperation::DoctorUpdate { .. } => "doctor_update",
            LegacyOperation::SaveContactId { .. } => "save_contact_id",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyEnvelope {
    pub ok: bool,
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

#[async_trait]
pub trait LegacyStore: Send + Sync {
    /// Sends one operation and returns the envelope payload on `ok: true`.
    async fn call(&self, operation: &LegacyOperation) -> Result<Value, LegacyStoreError>;
}

pub struct HttpLegacyStore {
    client: Client,
    url: String,
    token: String,
    timeout: Duration,
}

impl HttpLegacyStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.legacy_store_url.clone(),
            token: config.legacy_store_token.clone(),
            timeout: config.legacy_store_timeout(),
        }
    }
}

#[async_trait]
impl LegacyStore for HttpLegacyStore {
    async fn call(&self, operation: &LegacyOperation) -> Result<Value, LegacyStoreError> {
        if self.url.is_empty() {
            return Err(LegacyStoreError::NotConfigured);
        }

        let mut body = serde_json::to_value(operation).map_err(|e| LegacyStoreError::Decode(e.to_string()))?;
        if !self.token.is_empty() {
            body["token"] = Value::String(self.token.clone());
        }

        debug!(op = operation.kind(), patient_id = operation.patient_id(), "Calling legacy store");

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LegacyStoreError::Timeout(self.timeout)
                } else {
                    LegacyStoreError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Legacy store answered {} for {}: {}", status, operation.kind(), text);
            return Err(LegacyStoreError::Transport(format!("HTTP {}: {}", status, text)));
        }

        let envelope: LegacyEnvelope = response
            .json()
            .await
            .map_err(|e| LegacyStoreError::Decode(e.to_string()))?;

        if !envelope.ok {
            return Err(LegacyStoreError::Rejected(
                envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(Value::Object(envelope.payload))
    }
}
