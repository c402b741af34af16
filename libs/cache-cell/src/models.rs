use std::fmt;

use serde::Deserialize;

/// Cached read models. Every key belongs to exactly one patient.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Dashboard(String),
    Reorders(String),
}

impl CacheKey {
    /// Every key a write for `patient_id` may have made stale.
    pub fn all_for(patient_id: &str) -> Vec<CacheKey> {
        vec![
            CacheKey::Dashboard(patient_id.to_string()),
            CacheKey::Reorders(patient_id.to_string()),
        ]
    }

    pub fn patient_id(&self) -> &str {
        match self {
            CacheKey::Dashboard(id) | CacheKey::Reorders(id) => id,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Dashboard(id) => write!(f, "dashboard:{}", id),
            CacheKey::Reorders(id) => write!(f, "reorders:{}", id),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    pub patient_id: Option<String>,
}
