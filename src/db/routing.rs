//! Datasource routing.
//!
//! A [`RoutingContext`] names the backend one unit of work should use. It is a
//! plain value owned by that unit of work and passed explicitly; nothing is
//! stored in thread-locals or globals. [`RoutingDataSource`] resolves the
//! selected name to a registered [`PooledHandle`].

use crate::db::pool::{DbConnection, PooledHandle};
use crate::db::registry::DataSourceRegistry;
use crate::error::{GatewayError, GatewayResult};
use crate::models::DEFAULT_DATASOURCE;
use std::ops::Deref;
use std::sync::Arc;

/// Per-unit-of-work backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingContext {
    selected: Option<String>,
}

impl RoutingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a backend. Blank names select the default.
    pub fn select(&mut self, name: &str) {
        let name = name.trim();
        self.selected = if name.is_empty() {
            Some(DEFAULT_DATASOURCE.to_string())
        } else {
            Some(name.to_string())
        };
    }

    /// The selected backend, or the default when nothing is selected.
    pub fn current(&self) -> &str {
        self.selected.as_deref().unwrap_or(DEFAULT_DATASOURCE)
    }

    pub fn is_selected(&self) -> bool {
        self.selected.is_some()
    }

    pub fn reset(&mut self) {
        self.selected = None;
    }

    /// Select `name` until the returned guard is dropped.
    ///
    /// The selection is cleared on every exit path, including `?` returns and panics.
    pub fn scoped(&mut self, name: &str) -> RoutingScope<'_> {
        self.select(name);
        RoutingScope { context: self }
    }
}

/// RAII guard returned by [`RoutingContext::scoped`].
#[derive(Debug)]
pub struct RoutingScope<'a> {
    context: &'a mut RoutingContext,
}

impl Deref for RoutingScope<'_> {
    type Target = RoutingContext;

    fn deref(&self) -> &RoutingContext {
        &*self.context
    }
}

impl Drop for RoutingScope<'_> {
    fn drop(&mut self) {
        self.context.reset();
    }
}

/// Virtual datasource that picks a registered pool per acquisition.
///
/// Routing only selects among handles already in the registry; it never
/// provisions one.
#[derive(Debug, Clone)]
pub struct RoutingDataSource {
    registry: Arc<DataSourceRegistry>,
}

impl RoutingDataSource {
    pub fn new(registry: Arc<DataSourceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<DataSourceRegistry> {
        &self.registry
    }

    /// Handle for the backend selected in `context`.
    pub async fn resolve(&self, context: &RoutingContext) -> GatewayResult<Arc<PooledHandle>> {
        self.handle_for(context.current()).await
    }

    /// Handle registered under `name`.
    pub async fn handle_for(&self, name: &str) -> GatewayResult<Arc<PooledHandle>> {
        self.registry
            .get(name)
            .await
            .ok_or_else(|| GatewayError::datasource_not_found(name))
    }

    /// Borrow a connection from the backend selected in `context`.
    pub async fn get_connection(&self, context: &RoutingContext) -> GatewayResult<DbConnection> {
        self.resolve(context).await?.acquire().await
    }
}
