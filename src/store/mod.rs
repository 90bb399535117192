//! API definition storage.
//!
//! The engine only reads definitions through [`DefinitionStore`]; management
//! operations (create, update, publish) live on the same trait so one backend
//! serves both sides.

mod memory;

pub use memory::InMemoryDefinitionStore;

use crate::error::{GatewayError, GatewayResult};
use crate::models::{ApiDefinition, PublishStatus};
use std::future::Future;

/// Backend holding API definitions keyed by id and by (path, method).
pub trait DefinitionStore: Send + Sync {
    fn get(&self, id: u64) -> impl Future<Output = GatewayResult<Option<ApiDefinition>>> + Send;

    /// Look up by (path, method) regardless of status. `method` is matched case-insensitively.
    fn find(
        &self,
        path: &str,
        method: &str,
    ) -> impl Future<Output = GatewayResult<Option<ApiDefinition>>> + Send;

    fn list(&self) -> impl Future<Output = GatewayResult<Vec<ApiDefinition>>> + Send;

    /// Validate and persist a new definition, returning it with its assigned id.
    fn create(
        &self,
        definition: ApiDefinition,
    ) -> impl Future<Output = GatewayResult<ApiDefinition>> + Send;

    /// Replace the stored definition with the same id.
    fn update(
        &self,
        definition: ApiDefinition,
    ) -> impl Future<Output = GatewayResult<ApiDefinition>> + Send;

    fn delete(&self, id: u64) -> impl Future<Output = GatewayResult<bool>> + Send;

    /// Overwrite the status without checking the transition.
    fn set_status(
        &self,
        id: u64,
        status: PublishStatus,
    ) -> impl Future<Output = GatewayResult<ApiDefinition>> + Send;

    /// Look up a definition that can be executed right now.
    fn find_published(
        &self,
        path: &str,
        method: &str,
    ) -> impl Future<Output = GatewayResult<Option<ApiDefinition>>> + Send {
        async move {
            Ok(self
                .find(path, method)
                .await?
                .filter(|definition| definition.status.is_invocable()))
        }
    }

    /// Move a definition to `Published`. Publishing twice is a no-op.
    fn publish(&self, id: u64) -> impl Future<Output = GatewayResult<ApiDefinition>> + Send {
        async move {
            let current = self.get(id).await?.ok_or_else(|| missing(id))?;
            let next = current.status.publish()?;
            if next == current.status {
                return Ok(current);
            }
            self.set_status(id, next).await
        }
    }

    /// Move a definition to `Offline`. Drafts are rejected.
    fn take_offline(&self, id: u64) -> impl Future<Output = GatewayResult<ApiDefinition>> + Send {
        async move {
            let current = self.get(id).await?.ok_or_else(|| missing(id))?;
            let next = current.status.take_offline()?;
            if next == current.status {
                return Ok(current);
            }
            self.set_status(id, next).await
        }
    }
}

fn missing(id: u64) -> GatewayError {
    GatewayError::validation(format!("API definition {id} does not exist"))
}
