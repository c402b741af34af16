use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, instrument, warn};

use monitoring_cell::{AlertManagerService, AlertSeverity};

use crate::error::CacheError;
use crate::models::CacheKey;
use crate::services::edge::EdgeCache;
use crate::services::local::LocalCache;

pub struct CacheConsistencyService {
    edge: Arc<dyn EdgeCache>,
    local: LocalCache,
    edge_ttl: Duration,
    alerts: Arc<AlertManagerService>,
}

impl CacheConsistencyService {
    pub fn new(
        edge: Arc<dyn EdgeCache>,
        edge_ttl: Duration,
        local_ttl: Duration,
        alerts: Arc<AlertManagerService>,
    ) -> Self {
        Self {
            edge,
            local: LocalCache::new(local_ttl),
            edge_ttl,
            alerts,
        }
    }

    /// Clears every cached read model of `patient_id` in both tiers.
    ///
    /// Must complete before the write that triggered it is acknowledged.
    /// A failure raises a critical alert and is returned to the caller.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, patient_id: &str) -> Result<(), CacheError> {
        let keys: Vec<String> = CacheKey::all_for(patient_id)
            .iter()
            .map(ToString::to_string)
            .collect();

        self.local.remove(&keys).await;

        if let Err(err) = self.edge.invalidate(&keys).await {
            error!(patient_id = %patient_id, "Edge cache invalidation failed: {}", err);
            self.alerts
                .raise(
                    AlertSeverity::Critical,
                    "cache",
                    "Cache invalidation failed",
                    format!("keys {:?} may serve stale data: {}", keys, err),
                    Some(patient_id),
                    &[("keys", keys.join(",")), ("edge_error", err.to_string())],
                )
                .await;
            return Err(CacheError::InvalidationFailed {
                patient_id: patient_id.to_string(),
                reason: err.to_string(),
            });
        }

        info!(patient_id = %patient_id, "Invalidated cached read models");
        Ok(())
    }

    /// Serves `key` from the local tier, then the edge tier, then `loader`.
    ///
    /// Loaded snapshots are stored only if no invalidation happened since the
    /// load started. Edge outages degrade to uncached loads.
    pub async fn get_or_populate<T, E, F, Fut>(&self, key: &CacheKey, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let cache_key = key.to_string();

        let generation = match self.edge.generation(&cache_key).await {
            Ok(generation) => generation,
            Err(err) => {
                warn!("Edge cache unavailable for {}, loading uncached: {}", cache_key, err);
                return loader().await;
            }
        };

        if let Some(raw) = self.local.get(&cache_key, generation).await {
            if let Ok(value) = serde_json::from_str(&raw) {
                debug!("Local cache hit for {}", cache_key);
                return Ok(value);
            }
        }

        match self.edge.get(&cache_key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!("Edge cache hit for {}", cache_key);
                    self.local.put(&cache_key, generation, raw).await;
                    return Ok(value);
                }
                Err(err) => warn!("Discarding undecodable edge entry {}: {}", cache_key, err),
            },
            Ok(None) => {}
            Err(err) => warn!("Edge cache read failed for {}: {}", cache_key, err),
        }

        let value = loader().await?;
        let raw = serde_json::to_string(&value).map_err(CacheError::from)?;

        match self
            .edge
            .put_if_generation(&cache_key, &raw, generation, self.edge_ttl)
            .await
        {
            Ok(true) => {
                self.local.put(&cache_key, generation, raw).await;
                debug!("Populated {} at generation {}", cache_key, generation);
            }
            Ok(false) => debug!("Skipped populating {}: invalidated during load", cache_key),
            Err(err) => warn!("Failed to populate edge entry {}: {}", cache_key, err),
        }

        Ok(value)
    }
}
