//! HTTP transport for published APIs.
//!
//! Routes:
//! - `ANY /api/apis/execute/{*path}` executes the definition for `/{path}` and
//!   the request method
//! - `GET /gateway/health` reports liveness and registered datasources
//! - `GET /gateway/info` reports the service name and version

use crate::db::{DataSourceRegistry, HandleSummary};
use crate::engine::ExecutionEngine;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{ExecutionResult, Params, QueryParam};
use crate::store::DefinitionStore;
use crate::transport::Transport;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::routing::{any, get};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// Prefix under which published APIs are served.
pub const EXECUTE_PREFIX: &str = "/api/apis/execute";

/// Shared state handed to every handler.
pub struct AppState<S> {
    pub engine: Arc<ExecutionEngine<S>>,
    pub registry: Arc<DataSourceRegistry>,
}

// Manual impl: `S` itself need not be `Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            registry: Arc::clone(&self.registry),
        }
    }
}

/// HTTP transport implementation.
pub struct HttpTransport<S> {
    state: AppState<S>,
    /// Host to bind to
    host: String,
    /// Port to bind to
    port: u16,
}

impl<S: DefinitionStore + 'static> HttpTransport<S> {
    pub fn new(
        engine: Arc<ExecutionEngine<S>>,
        registry: Arc<DataSourceRegistry>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            state: AppState { engine, registry },
            host: host.into(),
            port,
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }
}

/// Build the application router.
pub fn router<S: DefinitionStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route(
            &format!("{EXECUTE_PREFIX}/{{*path}}"),
            any(execute_api::<S>),
        )
        .route("/gateway/health", get(health::<S>))
        .route("/gateway/info", get(service_info))
        .with_state(state)
}

impl<S: DefinitionStore + 'static> Transport for HttpTransport<S> {
    async fn run(&self) -> GatewayResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting SQL API gateway on {}", bind_addr);

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            GatewayError::internal(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;
        info!(prefix = EXECUTE_PREFIX, "API endpoint ready");

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(wait_for_signal())
            .await;

        // Close database connections
        info!("Closing database connections");
        self.state.registry.clear_cache().await;

        match result {
            Ok(()) => {
                info!("HTTP server stopped");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "HTTP server error");
                Err(GatewayError::internal(format!("HTTP server error: {}", e)))
            }
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Merge query-string parameters with a JSON object body. Body keys win.
fn merge_params(query: HashMap<String, String>, body: &[u8]) -> GatewayResult<Params> {
    let mut params: Params = query
        .into_iter()
        .map(|(key, value)| (key, QueryParam::String(value)))
        .collect();

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(params);
    }

    let parsed: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| GatewayError::validation(format!("Invalid JSON body: {}", e)))?;
    match parsed {
        serde_json::Value::Object(map) => {
            params.extend(map.into_iter().map(|(key, value)| (key, QueryParam::from(value))));
            Ok(params)
        }
        _ => Err(GatewayError::validation("Request body must be a JSON object")),
    }
}

async fn execute_api<S: DefinitionStore + 'static>(
    State(state): State<AppState<S>>,
    method: Method,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<(StatusCode, Json<ExecutionResult>), GatewayError> {
    let path = format!("/{}", path.trim_start_matches('/'));
    let request_id = Uuid::new_v4();
    let span = info_span!("api_request", %request_id, method = %method, path = %path);

    let params = merge_params(query, &body).inspect_err(|e| {
        span.in_scope(|| warn!(error = %e, "Rejected API request"));
    })?;

    let result = state
        .engine
        .execute(&path, method.as_str(), &params)
        .instrument(span)
        .await;

    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(result)))
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    timestamp: DateTime<Utc>,
    service: &'static str,
    datasources: Vec<HandleSummary>,
}

async fn health<S: DefinitionStore + 'static>(State(state): State<AppState<S>>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "UP",
        timestamp: Utc::now(),
        service: env!("CARGO_PKG_NAME"),
        datasources: state.registry.summaries().await,
    })
}

async fn service_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
    }))
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::RoutingDataSource;
    use crate::models::{ApiDefinition, DataSourceConfig, PublishStatus};
    use crate::store::InMemoryDefinitionStore;
    use tempfile::TempDir;

    async fn state(dir: &TempDir) -> AppState<InMemoryDefinitionStore> {
        let path = dir.path().join("master.db");
        let config = DataSourceConfig::new("master", format!("sqlite:{}", path.display())).unwrap();
        let registry = Arc::new(DataSourceRegistry::new());
        registry.create_or_get(&config).await.unwrap();

        let store = Arc::new(InMemoryDefinitionStore::new());
        store
            .create(
                ApiDefinition::new("/echo", "GET", "SELECT '${name}' AS name")
                    .with_status(PublishStatus::Published),
            )
            .await
            .unwrap();

        let engine = ExecutionEngine::new(store, RoutingDataSource::new(Arc::clone(&registry)));
        AppState {
            engine: Arc::new(engine),
            registry,
        }
    }

    #[test]
    fn test_merge_params_body_wins() {
        let query = HashMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "q".to_string()),
        ]);
        let params = merge_params(query, br#"{"b": "body", "c": 3}"#).unwrap();
        assert_eq!(params["a"], QueryParam::String("1".to_string()));
        assert_eq!(params["b"], QueryParam::String("body".to_string()));
        assert_eq!(params["c"], QueryParam::Int(3));
    }

    #[test]
    fn test_merge_params_empty_body() {
        let params = merge_params(HashMap::new(), b"  \n").unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_merge_params_rejects_bad_body() {
        assert!(matches!(
            merge_params(HashMap::new(), b"[1, 2]"),
            Err(GatewayError::ValidationFailed { .. })
        ));
        assert!(matches!(
            merge_params(HashMap::new(), b"{oops"),
            Err(GatewayError::ValidationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_api_success() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir).await;

        let (status, Json(result)) = execute_api(
            State(state),
            Method::GET,
            Path("echo".to_string()),
            Query(HashMap::from([("name".to_string(), "ada".to_string())])),
            Bytes::new(),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert!(result.success);
        let rows = result.rows.unwrap();
        assert_eq!(rows[0].get("name").and_then(|v| v.as_str()), Some("ada"));
    }

    #[tokio::test]
    async fn test_execute_api_wrong_method_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir).await;

        let (status, Json(result)) = execute_api(
            State(state),
            Method::POST,
            Path("echo".to_string()),
            Query(HashMap::new()),
            Bytes::new(),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_health_lists_datasources() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir).await;

        let Json(body) = health(State(state)).await;
        assert_eq!(body.status, "UP");
        assert_eq!(body.datasources.len(), 1);
        assert_eq!(body.datasources[0].name, "master");
    }
}
