//! Definition-driven statement execution.

use crate::db::{QueryExecutor, RoutingDataSource};
use crate::engine::statement::{StatementKind, StatementVerb};
use crate::engine::template::{PlaceholderStyle, SqlTemplate};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{
    ApiDefinition, DEFAULT_DATASOURCE, ExecuteOptions, ExecutionResult, Params, QueryParam, Row,
    normalize_method,
};
use crate::store::DefinitionStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How placeholders reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rendering {
    /// Parameter text is substituted into the SQL.
    Spliced,
    /// Placeholders become positional markers and values are bound.
    Bound,
}

enum Outcome {
    Rows(Vec<Row>),
    Affected(u64),
}

/// Resolves a published definition, renders its SQL and runs it on the
/// `master` datasource.
///
/// Every fault is reported in the returned [`ExecutionResult`]; none of the
/// `execute*` methods fail.
#[derive(Debug)]
pub struct ExecutionEngine<S> {
    store: Arc<S>,
    router: RoutingDataSource,
    executor: QueryExecutor,
}

impl<S: DefinitionStore> ExecutionEngine<S> {
    pub fn new(store: Arc<S>, router: RoutingDataSource) -> Self {
        Self {
            store,
            router,
            executor: QueryExecutor::new(),
        }
    }

    pub fn with_executor(mut self, executor: QueryExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn router(&self) -> &RoutingDataSource {
        &self.router
    }

    /// Execute the definition for (`path`, `method`), splicing `params` into its SQL.
    pub async fn execute(&self, path: &str, method: &str, params: &Params) -> ExecutionResult {
        self.execute_with(path, method, params, &ExecuteOptions::default())
            .await
    }

    /// [`execute`](Self::execute) with a caller-supplied time limit.
    pub async fn execute_with(
        &self,
        path: &str,
        method: &str,
        params: &Params,
        options: &ExecuteOptions,
    ) -> ExecutionResult {
        self.run(path, method, params, options, Rendering::Spliced)
            .await
    }

    /// Execute with parameters bound instead of spliced. Every placeholder must
    /// have a parameter.
    pub async fn execute_bound(
        &self,
        path: &str,
        method: &str,
        params: &Params,
        options: &ExecuteOptions,
    ) -> ExecutionResult {
        self.run(path, method, params, options, Rendering::Bound)
            .await
    }

    async fn run(
        &self,
        path: &str,
        method: &str,
        params: &Params,
        options: &ExecuteOptions,
        rendering: Rendering,
    ) -> ExecutionResult {
        let start = Instant::now();
        let outcome = self.try_run(path, method, params, options, rendering).await;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(Outcome::Rows(rows)) => {
                info!(path, method, rows = rows.len(), elapsed_ms, "API query executed");
                ExecutionResult::query(rows, elapsed_ms)
            }
            Ok(Outcome::Affected(affected)) => {
                info!(path, method, affected, elapsed_ms, "API mutation executed");
                ExecutionResult::mutation(affected, elapsed_ms)
            }
            Err(e) => {
                warn!(path, method, error = %e, elapsed_ms, "API execution failed");
                ExecutionResult::failure(e.to_string(), elapsed_ms)
            }
        }
    }

    async fn try_run(
        &self,
        path: &str,
        method: &str,
        params: &Params,
        options: &ExecuteOptions,
        rendering: Rendering,
    ) -> GatewayResult<Outcome> {
        if path.trim().is_empty() {
            return Err(GatewayError::validation("API path must not be empty"));
        }
        if method.trim().is_empty() {
            return Err(GatewayError::validation("API method must not be empty"));
        }

        let definition = self.lookup(path, method).await?;
        let handle = self.router.handle_for(DEFAULT_DATASOURCE).await?;

        let template = SqlTemplate::parse(&definition.sql);
        let (sql, bound): (String, Vec<QueryParam>) = match rendering {
            Rendering::Spliced => (template.splice(params), Vec::new()),
            Rendering::Bound => {
                let statement =
                    template.bind(params, PlaceholderStyle::for_vendor(handle.vendor()))?;
                (statement.sql, statement.params)
            }
        };

        let verb = StatementVerb::classify(&sql);
        debug!(
            id = ?definition.id,
            datasource = handle.name(),
            verb = %verb,
            sql = %sql,
            "Rendered API statement"
        );

        let mut conn = handle.acquire().await?;
        match verb.kind() {
            StatementKind::Query => self
                .executor
                .fetch_rows(&mut conn, &sql, &bound, options.timeout)
                .await
                .map(Outcome::Rows),
            StatementKind::Mutation => self
                .executor
                .execute_mutation(&mut conn, &sql, &bound, options.timeout)
                .await
                .map(Outcome::Affected),
        }
    }

    /// Uses `find` rather than `find_published` so an unpublished definition is
    /// reported separately from a missing one.
    async fn lookup(&self, path: &str, method: &str) -> GatewayResult<ApiDefinition> {
        match self.store.find(path, method).await? {
            None => Err(GatewayError::definition_not_found(
                path.trim(),
                normalize_method(method),
            )),
            Some(definition) if !definition.status.is_invocable() => {
                Err(GatewayError::definition_not_published(
                    definition.path,
                    definition.method,
                    definition.status,
                ))
            }
            Some(definition) => Ok(definition),
        }
    }
}
