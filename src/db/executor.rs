//! Statement execution against a borrowed connection.
//!
//! Queries return decoded [`Row`]s in server order; mutations return the
//! affected-row count. Both accept an optional time limit.
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific query and write operations
//! - `postgres`: PostgreSQL-specific query and write operations
//! - `sqlite`: SQLite-specific query and write operations
//!
//! Statements without parameters are sent as raw SQL so that text the server
//! cannot prepare (DDL, procedure bodies) still runs.

use crate::db::pool::DbConnection;
use crate::db::types::RowDecode;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{QueryParam, Row};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Runs statements with an optional default time limit.
#[derive(Debug, Clone, Default)]
pub struct QueryExecutor {
    default_timeout: Option<Duration>,
}

impl QueryExecutor {
    /// Executor without a time limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor that bounds every statement by `limit` unless a call overrides it.
    pub fn with_timeout(limit: Duration) -> Self {
        Self {
            default_timeout: Some(limit),
        }
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Run a row-returning statement and decode every row.
    pub async fn fetch_rows(
        &self,
        conn: &mut DbConnection,
        sql: &str,
        params: &[QueryParam],
        limit: Option<Duration>,
    ) -> GatewayResult<Vec<Row>> {
        let limit = limit.or(self.default_timeout);
        debug!(
            sql = %sql,
            params = params.len(),
            timeout_ms = ?limit.map(|d| d.as_millis()),
            vendor = %conn.vendor(),
            "Executing query"
        );

        match conn {
            DbConnection::MySql(c) => {
                let rows = with_timeout("query execution", limit, mysql::fetch(c, sql, params)).await?;
                decode_rows(&rows)
            }
            DbConnection::Postgres(c) => {
                let rows =
                    with_timeout("query execution", limit, postgres::fetch(c, sql, params)).await?;
                decode_rows(&rows)
            }
            DbConnection::Sqlite(c) => {
                let rows =
                    with_timeout("query execution", limit, sqlite::fetch(c, sql, params)).await?;
                decode_rows(&rows)
            }
        }
    }

    /// Run a data-modifying statement and return the affected-row count.
    pub async fn execute_mutation(
        &self,
        conn: &mut DbConnection,
        sql: &str,
        params: &[QueryParam],
        limit: Option<Duration>,
    ) -> GatewayResult<u64> {
        let limit = limit.or(self.default_timeout);
        debug!(
            sql = %sql,
            params = params.len(),
            timeout_ms = ?limit.map(|d| d.as_millis()),
            vendor = %conn.vendor(),
            "Executing mutation"
        );

        match conn {
            DbConnection::MySql(c) => {
                with_timeout("write operation", limit, mysql::execute(c, sql, params)).await
            }
            DbConnection::Postgres(c) => {
                with_timeout("write operation", limit, postgres::execute(c, sql, params)).await
            }
            DbConnection::Sqlite(c) => {
                with_timeout("write operation", limit, sqlite::execute(c, sql, params)).await
            }
        }
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn decode_rows<R: RowDecode>(rows: &[R]) -> GatewayResult<Vec<Row>> {
    rows.iter().map(RowDecode::decode_row).collect()
}

async fn with_timeout<T, F>(operation: &str, limit: Option<Duration>, fut: F) -> GatewayResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(GatewayError::from),
            Err(_) => Err(GatewayError::timeout(operation, limit)),
        },
        None => fut.await.map_err(GatewayError::from),
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.

mod mysql {
    use super::*;
    use crate::db::params::mysql_query;
    use futures_util::TryStreamExt;
    use sqlx::mysql::MySqlRow;
    use sqlx::pool::PoolConnection;
    use sqlx::{Executor, MySql};

    pub async fn fetch(
        conn: &mut PoolConnection<MySql>,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<Vec<MySqlRow>, sqlx::Error> {
        if params.is_empty() {
            (&mut **conn).fetch(sql).try_collect().await
        } else {
            mysql_query(sql, params).fetch(&mut **conn).try_collect().await
        }
    }

    pub async fn execute(
        conn: &mut PoolConnection<MySql>,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<u64, sqlx::Error> {
        let result = if params.is_empty() {
            (&mut **conn).execute(sql).await?
        } else {
            mysql_query(sql, params).execute(&mut **conn).await?
        };
        Ok(result.rows_affected())
    }
}

mod postgres {
    use super::*;
    use crate::db::params::postgres_query;
    use futures_util::TryStreamExt;
    use sqlx::pool::PoolConnection;
    use sqlx::postgres::PgRow;
    use sqlx::{Executor, Postgres};

    pub async fn fetch(
        conn: &mut PoolConnection<Postgres>,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<Vec<PgRow>, sqlx::Error> {
        if params.is_empty() {
            (&mut **conn).fetch(sql).try_collect().await
        } else {
            postgres_query(sql, params).fetch(&mut **conn).try_collect().await
        }
    }

    pub async fn execute(
        conn: &mut PoolConnection<Postgres>,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<u64, sqlx::Error> {
        let result = if params.is_empty() {
            (&mut **conn).execute(sql).await?
        } else {
            postgres_query(sql, params).execute(&mut **conn).await?
        };
        Ok(result.rows_affected())
    }
}

mod sqlite {
    use super::*;
    use crate::db::params::sqlite_query;
    use futures_util::TryStreamExt;
    use sqlx::pool::PoolConnection;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Executor, Sqlite};

    pub async fn fetch(
        conn: &mut PoolConnection<Sqlite>,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<Vec<SqliteRow>, sqlx::Error> {
        if params.is_empty() {
            (&mut **conn).fetch(sql).try_collect().await
        } else {
            sqlite_query(sql, params).fetch(&mut **conn).try_collect().await
        }
    }

    pub async fn execute(
        conn: &mut PoolConnection<Sqlite>,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<u64, sqlx::Error> {
        let result = if params.is_empty() {
            (&mut **conn).execute(sql).await?
        } else {
            sqlite_query(sql, params).execute(&mut **conn).await?
        };
        Ok(result.rows_affected())
    }
}
