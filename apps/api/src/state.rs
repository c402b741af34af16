use std::sync::Arc;

use anyhow::{Context, Result};
use deadpool_redis::{Config as RedisConfig, Runtime};
use tracing::{info, warn};

use cache_cell::{CacheConsistencyService, EdgeCache, MemoryEdgeCache, RedisEdgeCache};
use lock_cell::{LockManager, RedisLockBackend};
use monitoring_cell::AlertManagerService;
use payment_cell::WebhookReconciler;
use scheduling_cell::SlotScheduler;
use shared_config::AppConfig;
use shared_database::{ClinicStore, HttpLegacyStore, LegacyStore, MemoryClinicStore, SupabaseClinicStore};
use sync_cell::CrossStoreSync;
use visit_cell::{
    DashboardService, ReorderService, ShippingService, VisitCellState, VisitLifecycleService, VisitService,
};

/// External stores and coordination backends the services run on.
pub struct Backends {
    pub store: Arc<dyn ClinicStore>,
    pub legacy: Arc<dyn LegacyStore>,
    pub locks: LockManager,
    pub edge: Arc<dyn EdgeCache>,
}

impl Backends {
    /// Supabase and Redis when configured, in-process stand-ins otherwise.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store: Arc<dyn ClinicStore> = if config.is_mirror_configured() {
            Arc::new(SupabaseClinicStore::new(config).context("Failed to create relational mirror client")?)
        } else {
            warn!("SUPABASE_URL not set, using the in-memory mirror");
            Arc::new(MemoryClinicStore::new())
        };

        if !config.is_legacy_store_configured() {
            warn!("LEGACY_STORE_URL not set, legacy writes will queue as inconsistencies");
        }
        let legacy: Arc<dyn LegacyStore> = Arc::new(HttpLegacyStore::new(config));

        let (locks, edge): (LockManager, Arc<dyn EdgeCache>) = match &config.redis_url {
            Some(url) => {
                let pool = RedisConfig::from_url(url.clone())
                    .create_pool(Some(Runtime::Tokio1))
                    .context("Failed to create Redis pool")?;
                info!("Using Redis for locks and the edge cache");
                (
                    LockManager::new(Arc::new(RedisLockBackend::with_pool(pool.clone())), config.lock_lease()),
                    Arc::new(RedisEdgeCache::with_pool(pool)),
                )
            }
            None => {
                warn!("REDIS_URL not set, locks and the edge cache are process-local");
                (LockManager::local(config.lock_lease()), Arc::new(MemoryEdgeCache::new()))
            }
        };

        Ok(Self {
            store,
            legacy,
            locks,
            edge,
        })
    }
}

/// Every service the HTTP surface routes to.
#[derive(Clone)]
pub struct AppServices {
    pub alerts: Arc<AlertManagerService>,
    pub cache: Arc<CacheConsistencyService>,
    pub sync: Arc<CrossStoreSync>,
    pub scheduler: Arc<SlotScheduler>,
    pub visit: VisitCellState,
    pub webhooks: Arc<WebhookReconciler>,
}

impl AppServices {
    pub fn build(config: Arc<AppConfig>, backends: Backends) -> Self {
        let Backends {
            store,
            legacy,
            locks,
            edge,
        } = backends;

        let alerts = Arc::new(AlertManagerService::new());
        let cache = Arc::new(CacheConsistencyService::new(
            edge,
            config.edge_cache_ttl(),
            config.local_cache_ttl(),
            alerts.clone(),
        ));
        let sync = Arc::new(CrossStoreSync::new(store.clone(), legacy, alerts.clone()));
        let scheduler = Arc::new(SlotScheduler::new(store.clone(), locks.clone(), config.clone()));

        let visit = VisitCellState {
            visits: Arc::new(VisitService::new(
                store.clone(),
                scheduler.clone(),
                locks.clone(),
                sync.clone(),
                cache.clone(),
                config.clone(),
            )),
            reorders: Arc::new(ReorderService::new(store.clone(), locks, cache.clone(), config.clone())),
            shipping: Arc::new(ShippingService::new(store.clone(), cache.clone())),
            dashboards: Arc::new(DashboardService::new(
                store.clone(),
                cache.clone(),
                VisitLifecycleService::new(config.clinic_offset()),
            )),
        };

        let webhooks = Arc::new(WebhookReconciler::from_config(store, cache.clone(), &config));

        Self {
            alerts,
            cache,
            sync,
            scheduler,
            visit,
            webhooks,
        }
    }
}
