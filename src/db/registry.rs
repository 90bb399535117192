//! Datasource registry.
//!
//! Creates and caches one [`PooledHandle`] per datasource name. Concurrent
//! first requests for the same name share a single in-flight creation, so at
//! most one pool is ever built per name. A failed creation leaves an empty
//! slot, which lookups skip and the next creation reuses.

use crate::db::pool::{HandleSummary, PooledHandle};
use crate::error::{GatewayError, GatewayResult};
use crate::models::DataSourceConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

/// Fixed timeout applied to liveness probes.
pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

type HandleSlot = Arc<OnceCell<Arc<PooledHandle>>>;

#[derive(Debug, Default)]
pub struct DataSourceRegistry {
    slots: RwLock<HashMap<String, HandleSlot>>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle cached under `config.name`, creating it if absent.
    ///
    /// A cached handle is returned as-is, even if `config` differs from the one
    /// it was built from. Use [`register`](Self::register) to replace it.
    pub async fn create_or_get(&self, config: &DataSourceConfig) -> GatewayResult<Arc<PooledHandle>> {
        let slot = self.slot_for(&config.name).await;

        if let Some(handle) = slot.get() {
            debug!(datasource = %config.name, "Using cached connection pool");
            return Ok(Arc::clone(handle));
        }

        let handle = slot
            .get_or_try_init(|| async { PooledHandle::connect(config).await.map(Arc::new) })
            .await
            .map(Arc::clone)?;

        // The slot may have been drained or replaced while the pool was being built.
        if self.is_current(&config.name, &slot).await {
            return Ok(handle);
        }
        warn!(datasource = %config.name, "Registry changed during pool creation, discarding pool");
        handle.close().await;
        self.get(&config.name)
            .await
            .ok_or_else(|| GatewayError::datasource_not_found(&config.name))
    }

    /// Build a handle for `config` and install it, closing any handle it replaces.
    pub async fn register(&self, config: &DataSourceConfig) -> GatewayResult<Arc<PooledHandle>> {
        let handle = Arc::new(PooledHandle::connect(config).await?);
        let slot: HandleSlot = Arc::new(OnceCell::from(Arc::clone(&handle)));

        let replaced = {
            let mut slots = self.slots.write().await;
            slots.insert(config.name.clone(), slot)
        };

        if let Some(old) = replaced.as_ref().and_then(|slot| slot.get()) {
            warn!(datasource = %config.name, "Replacing registered connection pool");
            old.close().await;
        }
        Ok(handle)
    }

    /// Look up an initialized handle. Never creates one.
    pub async fn get(&self, name: &str) -> Option<Arc<PooledHandle>> {
        let slots = self.slots.read().await;
        slots.get(name).and_then(|slot| slot.get()).cloned()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.get(name).await.is_some()
    }

    /// Names of all initialized handles, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handles()
            .await
            .iter()
            .map(|handle| handle.name().to_string())
            .collect();
        names.sort();
        names
    }

    pub async fn handles(&self) -> Vec<Arc<PooledHandle>> {
        let slots = self.slots.read().await;
        slots
            .values()
            .filter_map(|slot| slot.get())
            .cloned()
            .collect()
    }

    pub async fn summaries(&self) -> Vec<HandleSummary> {
        let mut summaries: Vec<HandleSummary> =
            self.handles().await.iter().map(|h| h.summary()).collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    pub async fn len(&self) -> usize {
        self.handles().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove and close the handle registered under `name`.
    pub async fn remove(&self, name: &str) -> bool {
        let removed = {
            let mut slots = self.slots.write().await;
            slots.remove(name)
        };
        match removed.as_ref().and_then(|slot| slot.get()) {
            Some(handle) => {
                handle.close().await;
                true
            }
            None => false,
        }
    }

    /// Close every pool, then drop all cached handles.
    pub async fn clear_cache(&self) {
        let drained: Vec<HandleSlot> = {
            let mut slots = self.slots.write().await;
            slots.drain().map(|(_, slot)| slot).collect()
        };
        for handle in drained.iter().filter_map(|slot| slot.get()) {
            handle.close().await;
        }
        info!(count = drained.len(), "Datasource cache cleared");
    }

    /// Probe the datasource described by `config`, creating its handle if needed.
    ///
    /// Never fails; any fault yields `false`.
    pub async fn health_check(&self, config: &DataSourceConfig) -> bool {
        match self.create_or_get(config).await {
            Ok(handle) => {
                let healthy = handle.check_health(HEALTH_PROBE_TIMEOUT).await;
                info!(datasource = %config.name, healthy, "Datasource health check");
                healthy
            }
            Err(e) => {
                warn!(datasource = %config.name, error = %e, "Datasource health check failed");
                false
            }
        }
    }

    /// Check a candidate config with a throwaway pool. The cache is not touched.
    pub async fn test_connection(&self, config: &DataSourceConfig) -> bool {
        let handle = match PooledHandle::connect(config).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(datasource = %config.name, error = %e, "Connection test failed");
                return false;
            }
        };
        let result = handle.probe(HEALTH_PROBE_TIMEOUT).await;
        handle.close().await;
        match result {
            Ok(()) => {
                info!(datasource = %config.name, "Connection test succeeded");
                true
            }
            Err(e) => {
                warn!(datasource = %config.name, error = %e, "Connection test failed");
                false
            }
        }
    }

    /// Probe every registered handle. Returns `(name, healthy)` pairs sorted by name.
    pub async fn check_all(&self) -> Vec<(String, bool)> {
        let mut results = Vec::new();
        for handle in self.handles().await {
            let healthy = handle.check_health(HEALTH_PROBE_TIMEOUT).await;
            results.push((handle.name().to_string(), healthy));
        }
        results.sort();
        results
    }

    async fn slot_for(&self, name: &str) -> HandleSlot {
        {
            let slots = self.slots.read().await;
            if let Some(slot) = slots.get(name) {
                return Arc::clone(slot);
            }
        }
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(name.to_string()).or_default())
    }

    async fn is_current(&self, name: &str, slot: &HandleSlot) -> bool {
        let slots = self.slots.read().await;
        slots.get(name).is_some_and(|current| Arc::ptr_eq(current, slot))
    }
}
