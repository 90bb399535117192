//! Row decoding into dynamically typed values.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction
//!
//! NULL is detected before either phase runs. When the category-specific
//! decode does not fit the stored value (common with SQLite's dynamic typing),
//! each decoder falls back to text, integer, float and finally raw bytes. A
//! value that fits none of them fails the whole row.

use crate::error::{GatewayError, GatewayResult};
use crate::models::{Row, Value, VendorKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, ColumnIndex, Decode, Row as SqlxRow, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Date,
    Time,
    DateTime,
    /// Timezone-aware timestamp
    Timestamp,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, vendor: VendorKind) -> TypeCategory {
    let lower = type_name.trim().to_ascii_lowercase();
    let base = lower
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default();

    match base {
        // SQLite's NUMERIC affinity stores plain numbers
        "decimal" | "numeric" if vendor == VendorKind::Sqlite => TypeCategory::Float,
        "decimal" | "numeric" => TypeCategory::Decimal,
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "int2" | "int4"
        | "int8" | "serial" | "smallserial" | "bigserial" | "year" | "bit" => TypeCategory::Integer,
        "bool" | "boolean" => TypeCategory::Boolean,
        "float" | "double" | "real" | "float4" | "float8" => TypeCategory::Float,
        "json" | "jsonb" => TypeCategory::Json,
        "uuid" => TypeCategory::Uuid,
        "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
            TypeCategory::Binary
        }
        "date" => TypeCategory::Date,
        "time" => TypeCategory::Time,
        "datetime" => TypeCategory::DateTime,
        "timestamptz" => TypeCategory::Timestamp,
        // MySQL TIMESTAMP is stored in UTC
        "timestamp" if vendor == VendorKind::MySql || lower.contains("with time zone") => {
            TypeCategory::Timestamp
        }
        "timestamp" => TypeCategory::DateTime,
        _ => TypeCategory::Text,
    }
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Binary data as text: UTF-8 when valid, base64 otherwise.
pub fn binary_value(bytes: &[u8]) -> Value {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => Value::Text(s.to_string()),
        Err(_) => Value::Text(STANDARD.encode(bytes)),
    }
}

/// Unsigned integers beyond `i64::MAX` are kept exact as text.
fn unsigned_value(v: u64) -> Value {
    i64::try_from(v)
        .map(Value::Int)
        .unwrap_or_else(|_| Value::Text(v.to_string()))
}

// =============================================================================
// Row Decoding
// =============================================================================

/// Trait for converting database rows into ordered [`Row`] values.
pub trait RowDecode {
    fn decode_row(&self) -> GatewayResult<Row>;
}

impl RowDecode for MySqlRow {
    fn decode_row(&self) -> GatewayResult<Row> {
        decode_with(self, VendorKind::MySql, mysql::decode_column)
    }
}

impl RowDecode for PgRow {
    fn decode_row(&self) -> GatewayResult<Row> {
        decode_with(self, VendorKind::PostgreSql, postgres::decode_column)
    }
}

impl RowDecode for SqliteRow {
    fn decode_row(&self) -> GatewayResult<Row> {
        decode_with(self, VendorKind::Sqlite, sqlite::decode_column)
    }
}

fn decode_with<R>(
    row: &R,
    vendor: VendorKind,
    decode: fn(&R, usize, TypeCategory) -> Option<Value>,
) -> GatewayResult<Row>
where
    R: SqlxRow,
    usize: ColumnIndex<R>,
{
    let mut out = Row::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        if row.try_get_raw(idx)?.is_null() {
            out.insert(column.name(), Value::Null);
            continue;
        }

        let type_name = column.type_info().name();
        let category = categorize_type(type_name, vendor);
        let value = decode(row, idx, category).ok_or_else(|| {
            GatewayError::sql_execution(
                format!(
                    "Cannot convert column '{}' of type {} to a supported value",
                    column.name(),
                    type_name
                ),
                None,
            )
        })?;
        out.insert(column.name(), value);
    }
    Ok(out)
}

/// Decode column `idx` as `T`, or `None` if the stored value is not compatible.
fn attempt<'r, R, T>(row: &'r R, idx: usize) -> Option<T>
where
    R: SqlxRow,
    T: Decode<'r, R::Database> + Type<R::Database>,
    usize: ColumnIndex<R>,
{
    row.try_get::<T, usize>(idx).ok()
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> Option<Value> {
        let decoded = match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Float => attempt::<_, f64>(row, idx)
                .or_else(|| attempt::<_, f32>(row, idx).map(f64::from))
                .map(Value::Float),
            TypeCategory::Decimal => attempt::<_, RawDecimal>(row, idx).map(|d| Value::Text(d.0)),
            TypeCategory::Boolean => attempt::<_, bool>(row, idx)
                .or_else(|| attempt::<_, i8>(row, idx).map(|v| v != 0))
                .map(Value::Bool),
            TypeCategory::Binary => attempt::<_, Vec<u8>>(row, idx).map(|b| binary_value(&b)),
            TypeCategory::Json => {
                attempt::<_, serde_json::Value>(row, idx).map(|v| Value::Text(v.to_string()))
            }
            TypeCategory::Date => attempt::<_, NaiveDate>(row, idx).map(Value::Date),
            TypeCategory::Time => attempt::<_, NaiveTime>(row, idx).map(Value::Time),
            TypeCategory::DateTime => attempt::<_, NaiveDateTime>(row, idx).map(Value::DateTime),
            TypeCategory::Timestamp => attempt::<_, DateTime<Utc>>(row, idx)
                .map(Value::Timestamp)
                .or_else(|| attempt::<_, NaiveDateTime>(row, idx).map(Value::DateTime)),
            TypeCategory::Uuid | TypeCategory::Text => None,
        };
        decoded.or_else(|| fallback(row, idx))
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> Option<Value> {
        attempt::<_, i64>(row, idx)
            .map(Value::Int)
            .or_else(|| attempt::<_, u64>(row, idx).map(unsigned_value))
            .or_else(|| attempt::<_, i32>(row, idx).map(|v| Value::Int(v.into())))
            .or_else(|| attempt::<_, u32>(row, idx).map(|v| Value::Int(v.into())))
            .or_else(|| attempt::<_, i16>(row, idx).map(|v| Value::Int(v.into())))
            .or_else(|| attempt::<_, u16>(row, idx).map(|v| Value::Int(v.into())))
            .or_else(|| attempt::<_, i8>(row, idx).map(|v| Value::Int(v.into())))
            .or_else(|| attempt::<_, u8>(row, idx).map(|v| Value::Int(v.into())))
    }

    fn fallback(row: &MySqlRow, idx: usize) -> Option<Value> {
        attempt::<_, String>(row, idx)
            .map(Value::Text)
            .or_else(|| attempt::<_, i64>(row, idx).map(Value::Int))
            .or_else(|| attempt::<_, f64>(row, idx).map(Value::Float))
            .or_else(|| attempt::<_, Vec<u8>>(row, idx).map(|b| binary_value(&b)))
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> Option<Value> {
        let decoded = match category {
            TypeCategory::Integer => attempt::<_, i64>(row, idx)
                .or_else(|| attempt::<_, i32>(row, idx).map(i64::from))
                .or_else(|| attempt::<_, i16>(row, idx).map(i64::from))
                .map(Value::Int),
            TypeCategory::Float => attempt::<_, f64>(row, idx)
                .or_else(|| attempt::<_, f32>(row, idx).map(f64::from))
                .map(Value::Float),
            TypeCategory::Decimal => attempt::<_, RawDecimal>(row, idx).map(|d| Value::Text(d.0)),
            TypeCategory::Boolean => attempt::<_, bool>(row, idx).map(Value::Bool),
            TypeCategory::Binary => attempt::<_, Vec<u8>>(row, idx).map(|b| binary_value(&b)),
            TypeCategory::Json => {
                attempt::<_, serde_json::Value>(row, idx).map(|v| Value::Text(v.to_string()))
            }
            TypeCategory::Uuid => {
                attempt::<_, sqlx::types::Uuid>(row, idx).map(|v| Value::Text(v.to_string()))
            }
            TypeCategory::Date => attempt::<_, NaiveDate>(row, idx).map(Value::Date),
            TypeCategory::Time => attempt::<_, NaiveTime>(row, idx).map(Value::Time),
            TypeCategory::DateTime => attempt::<_, NaiveDateTime>(row, idx).map(Value::DateTime),
            TypeCategory::Timestamp => attempt::<_, DateTime<Utc>>(row, idx).map(Value::Timestamp),
            TypeCategory::Text => None,
        };
        decoded.or_else(|| fallback(row, idx))
    }

    fn fallback(row: &PgRow, idx: usize) -> Option<Value> {
        attempt::<_, String>(row, idx)
            .map(Value::Text)
            .or_else(|| attempt::<_, i64>(row, idx).map(Value::Int))
            .or_else(|| attempt::<_, f64>(row, idx).map(Value::Float))
            .or_else(|| attempt::<_, Vec<u8>>(row, idx).map(|b| binary_value(&b)))
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> Option<Value> {
        let decoded = match category {
            TypeCategory::Integer => attempt::<_, i64>(row, idx).map(Value::Int),
            TypeCategory::Float | TypeCategory::Decimal => {
                attempt::<_, f64>(row, idx).map(Value::Float)
            }
            TypeCategory::Boolean => attempt::<_, bool>(row, idx).map(Value::Bool),
            TypeCategory::Binary => attempt::<_, Vec<u8>>(row, idx).map(|b| binary_value(&b)),
            TypeCategory::Date => attempt::<_, NaiveDate>(row, idx).map(Value::Date),
            TypeCategory::Time => attempt::<_, NaiveTime>(row, idx).map(Value::Time),
            TypeCategory::DateTime => attempt::<_, NaiveDateTime>(row, idx)
                .map(Value::DateTime)
                .or_else(|| attempt::<_, DateTime<Utc>>(row, idx).map(Value::Timestamp)),
            TypeCategory::Timestamp => attempt::<_, DateTime<Utc>>(row, idx)
                .map(Value::Timestamp)
                .or_else(|| attempt::<_, NaiveDateTime>(row, idx).map(Value::DateTime)),
            // SQLite has no native JSON or UUID storage
            TypeCategory::Json | TypeCategory::Uuid | TypeCategory::Text => None,
        };
        decoded.or_else(|| fallback(row, idx))
    }

    fn fallback(row: &SqliteRow, idx: usize) -> Option<Value> {
        attempt::<_, String>(row, idx)
            .map(Value::Text)
            .or_else(|| attempt::<_, i64>(row, idx).map(Value::Int))
            .or_else(|| attempt::<_, f64>(row, idx).map(Value::Float))
            .or_else(|| attempt::<_, Vec<u8>>(row, idx).map(|b| binary_value(&b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn test_categorize_integers() {
        for name in ["INT4", "BIGINT UNSIGNED", "INTEGER", "tinyint(4)", "SMALLINT"] {
            assert_eq!(
                categorize_type(name, VendorKind::MySql),
                TypeCategory::Integer,
                "{name}"
            );
        }
        // "interval" and "point" must not be mistaken for integers
        assert_eq!(
            categorize_type("INTERVAL", VendorKind::PostgreSql),
            TypeCategory::Text
        );
        assert_eq!(
            categorize_type("POINT", VendorKind::PostgreSql),
            TypeCategory::Text
        );
    }

    #[test]
    fn test_categorize_decimal_per_vendor() {
        assert_eq!(
            categorize_type("NUMERIC", VendorKind::PostgreSql),
            TypeCategory::Decimal
        );
        assert_eq!(
            categorize_type("DECIMAL(10,2)", VendorKind::MySql),
            TypeCategory::Decimal
        );
        assert_eq!(
            categorize_type("NUMERIC", VendorKind::Sqlite),
            TypeCategory::Float
        );
    }

    #[test]
    fn test_categorize_temporal() {
        assert_eq!(
            categorize_type("TIMESTAMPTZ", VendorKind::PostgreSql),
            TypeCategory::Timestamp
        );
        assert_eq!(
            categorize_type("TIMESTAMP", VendorKind::PostgreSql),
            TypeCategory::DateTime
        );
        assert_eq!(
            categorize_type("TIMESTAMP", VendorKind::MySql),
            TypeCategory::Timestamp
        );
        assert_eq!(
            categorize_type("DATETIME", VendorKind::Sqlite),
            TypeCategory::DateTime
        );
        assert_eq!(categorize_type("DATE", VendorKind::Sqlite), TypeCategory::Date);
        assert_eq!(categorize_type("TIME", VendorKind::MySql), TypeCategory::Time);
    }

    #[test]
    fn test_categorize_misc() {
        assert_eq!(categorize_type("BOOL", VendorKind::PostgreSql), TypeCategory::Boolean);
        assert_eq!(categorize_type("JSONB", VendorKind::PostgreSql), TypeCategory::Json);
        assert_eq!(categorize_type("UUID", VendorKind::PostgreSql), TypeCategory::Uuid);
        assert_eq!(categorize_type("BYTEA", VendorKind::PostgreSql), TypeCategory::Binary);
        assert_eq!(categorize_type("DOUBLE", VendorKind::MySql), TypeCategory::Float);
        assert_eq!(categorize_type("VARCHAR", VendorKind::MySql), TypeCategory::Text);
        assert_eq!(categorize_type("NULL", VendorKind::Sqlite), TypeCategory::Text);
    }

    #[test]
    fn test_binary_value() {
        assert_eq!(binary_value(b"hello"), Value::Text("hello".to_string()));
        assert_eq!(
            binary_value(&[0xff, 0x00, 0x10]),
            Value::Text("/wAQ".to_string())
        );
    }

    #[test]
    fn test_unsigned_value() {
        assert_eq!(unsigned_value(42), Value::Int(42));
        assert_eq!(
            unsigned_value(u64::MAX),
            Value::Text(u64::MAX.to_string())
        );
    }

    #[tokio::test]
    async fn test_decode_sqlite_expression_row() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let row = sqlx::query("SELECT 7 AS n, 'abc' AS s, NULL AS z, 2.5 AS f, x'ff00' AS b")
            .fetch_one(&pool)
            .await
            .unwrap();
        let decoded = row.decode_row().unwrap();

        assert_eq!(
            decoded.columns().collect::<Vec<_>>(),
            vec!["n", "s", "z", "f", "b"]
        );
        assert_eq!(decoded.get("n"), Some(&Value::Int(7)));
        assert_eq!(decoded.get("s"), Some(&Value::Text("abc".to_string())));
        assert_eq!(decoded.get("z"), Some(&Value::Null));
        assert_eq!(decoded.get("f"), Some(&Value::Float(2.5)));
        assert_eq!(decoded.get("b"), Some(&Value::Text("/wA=".to_string())));
    }
}
