//! In-process definition store.

use super::DefinitionStore;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{ApiDefinition, DEFAULT_API_VERSION, DefinitionKey, PublishStatus, normalize_method};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    definitions: BTreeMap<u64, ApiDefinition>,
}

impl Inner {
    /// Id of another definition already using `key`.
    fn conflicting(&self, key: &DefinitionKey, except: Option<u64>) -> Option<u64> {
        self.definitions
            .iter()
            .find(|(id, def)| Some(**id) != except && def.key() == *key)
            .map(|(id, _)| *id)
    }
}

/// Definitions held in memory, ordered by id.
#[derive(Debug, Default)]
pub struct InMemoryDefinitionStore {
    inner: RwLock<Inner>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from a JSON array of definitions.
    ///
    /// Ids in the file are ignored and reassigned in file order. Each entry
    /// passes the same validation as [`create`](DefinitionStore::create).
    pub async fn load_from_file(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            GatewayError::internal(format!(
                "Failed to read definitions from {}: {}",
                path.display(),
                e
            ))
        })?;
        let definitions: Vec<ApiDefinition> = serde_json::from_str(&raw).map_err(|e| {
            GatewayError::validation(format!(
                "Invalid definitions file {}: {}",
                path.display(),
                e
            ))
        })?;

        let store = Self::new();
        for definition in definitions {
            store.create(definition).await?;
        }
        let count = store.len().await;
        info!(path = %path.display(), count, "Loaded API definitions");
        Ok(store)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.definitions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Trim and normalize fields, filling in defaults.
fn normalize(mut definition: ApiDefinition) -> GatewayResult<ApiDefinition> {
    definition.validate()?;
    definition.path = definition.path.trim().to_string();
    definition.method = normalize_method(&definition.method);
    if definition.name.trim().is_empty() {
        definition.name = definition.path.clone();
    }
    if definition.version.trim().is_empty() {
        definition.version = DEFAULT_API_VERSION.to_string();
    }
    Ok(definition)
}

fn duplicate(key: &DefinitionKey) -> GatewayError {
    GatewayError::validation(format!(
        "An API definition for {} {} already exists",
        key.method, key.path
    ))
}

fn unknown(id: u64) -> GatewayError {
    GatewayError::validation(format!("API definition {id} does not exist"))
}

impl DefinitionStore for InMemoryDefinitionStore {
    async fn get(&self, id: u64) -> GatewayResult<Option<ApiDefinition>> {
        Ok(self.inner.read().await.definitions.get(&id).cloned())
    }

    async fn find(&self, path: &str, method: &str) -> GatewayResult<Option<ApiDefinition>> {
        let key = DefinitionKey::new(path, method);
        let inner = self.inner.read().await;
        Ok(inner
            .definitions
            .values()
            .find(|def| def.key() == key)
            .cloned())
    }

    async fn list(&self) -> GatewayResult<Vec<ApiDefinition>> {
        Ok(self.inner.read().await.definitions.values().cloned().collect())
    }

    async fn create(&self, definition: ApiDefinition) -> GatewayResult<ApiDefinition> {
        let mut definition = normalize(definition)?;
        let key = definition.key();

        let mut inner = self.inner.write().await;
        if inner.conflicting(&key, None).is_some() {
            return Err(duplicate(&key));
        }
        inner.next_id += 1;
        let id = inner.next_id;
        definition.id = Some(id);
        inner.definitions.insert(id, definition.clone());

        info!(id, method = %key.method, path = %key.path, "API definition created");
        Ok(definition)
    }

    async fn update(&self, definition: ApiDefinition) -> GatewayResult<ApiDefinition> {
        let id = definition
            .id
            .ok_or_else(|| GatewayError::validation("API definition id is required for update"))?;
        let definition = normalize(definition)?;
        let key = definition.key();

        let mut inner = self.inner.write().await;
        if !inner.definitions.contains_key(&id) {
            return Err(unknown(id));
        }
        if inner.conflicting(&key, Some(id)).is_some() {
            return Err(duplicate(&key));
        }
        inner.definitions.insert(id, definition.clone());
        Ok(definition)
    }

    async fn delete(&self, id: u64) -> GatewayResult<bool> {
        Ok(self.inner.write().await.definitions.remove(&id).is_some())
    }

    async fn set_status(&self, id: u64, status: PublishStatus) -> GatewayResult<ApiDefinition> {
        let mut inner = self.inner.write().await;
        let definition = inner.definitions.get_mut(&id).ok_or_else(|| unknown(id))?;
        definition.status = status;
        info!(id, status = %status, "API definition status changed");
        Ok(definition.clone())
    }
}
