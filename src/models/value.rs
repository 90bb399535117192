//! Dynamically typed result values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

/// A single decoded column value.
///
/// Serializes untagged: scalars as JSON scalars, date/time values as ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    /// Timezone-aware timestamp, normalized to UTC
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// One result row: column name to value, in result-set column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    entries: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert a column. A repeated column name overwrites the earlier value in place.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.entries.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_preserves_insertion_order() {
        let mut row = Row::new();
        row.insert("zeta", Value::Int(1));
        row.insert("alpha", Value::Text("a".into()));
        row.insert("mid", Value::Null);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":"a","mid":null}"#);
    }

    #[test]
    fn test_row_duplicate_column_overwrites() {
        let mut row = Row::new();
        row.insert("id", Value::Int(1));
        row.insert("name", Value::Text("x".into()));
        row.insert("id", Value::Int(2));
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("id"), Some(&Value::Int(2)));
        assert_eq!(row.columns().next(), Some("id"));
    }

    #[test]
    fn test_row_from_iter_keeps_last_duplicate() {
        let row: Row = vec![
            ("b".to_string(), Value::Int(1)),
            ("a".to_string(), Value::Int(2)),
            ("b".to_string(), Value::Int(3)),
        ]
        .into_iter()
        .collect();
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"b":3,"a":2}"#
        );
    }

    #[test]
    fn test_value_serialization() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let datetime = date.and_hms_opt(8, 30, 0).unwrap();
        let values = vec![
            Value::Bool(true),
            Value::Float(1.5),
            Value::Date(date),
            Value::DateTime(datetime),
        ];
        assert_eq!(
            serde_json::to_string(&values).unwrap(),
            r#"[true,1.5,"2024-03-09","2024-03-09T08:30:00"]"#
        );
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(3).as_i64(), Some(3));
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Text("a".into()).as_str(), Some("a"));
        assert_eq!(Value::Bool(false).as_bool(), Some(false));
        assert!(Value::Null.is_null());
        assert_eq!(Value::Null.as_i64(), None);
    }
}
