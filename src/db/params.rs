//! Statement construction for bound execution.
//!
//! Each builder turns SQL text plus an ordered slice of [`QueryParam`] into a
//! vendor-specific `sqlx` query with every parameter bound in order.

use crate::models::QueryParam;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::types::Json;
use sqlx::{MySql, Postgres, Sqlite};

/// Bind every parameter in order. `$json` converts a JSON parameter into
/// whatever the vendor accepts for it.
macro_rules! bind_all {
    ($query:expr, $params:expr, json => $json:expr) => {{
        let mut query = $query;
        for param in $params {
            query = match param {
                // Untyped NULL; the server infers the column type
                QueryParam::Null => query.bind(None::<String>),
                QueryParam::Bool(v) => query.bind(*v),
                QueryParam::Int(v) => query.bind(*v),
                QueryParam::Float(v) => query.bind(*v),
                QueryParam::String(v) => query.bind(v.as_str()),
                QueryParam::Json(v) => query.bind(($json)(v)),
            };
        }
        query
    }};
}

pub(crate) fn mysql_query<'q>(
    sql: &'q str,
    params: &'q [QueryParam],
) -> Query<'q, MySql, MySqlArguments> {
    bind_all!(sqlx::query(sql), params, json => Json)
}

pub(crate) fn postgres_query<'q>(
    sql: &'q str,
    params: &'q [QueryParam],
) -> Query<'q, Postgres, PgArguments> {
    bind_all!(sqlx::query(sql), params, json => Json)
}

pub(crate) fn sqlite_query<'q>(
    sql: &'q str,
    params: &'q [QueryParam],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    // SQLite doesn't have native JSON type, store as string
    bind_all!(sqlx::query(sql), params, json => |v: &serde_json::Value| v.to_string())
}
