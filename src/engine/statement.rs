//! Statement classification by leading keyword.

use std::fmt;

/// Leading SQL keyword of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementVerb {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

/// How a statement is executed and what its result carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Returns rows.
    Query,
    /// Returns an affected-row count.
    Mutation,
}

impl StatementVerb {
    /// Classify `sql` by its first word, ignoring leading whitespace and case.
    pub fn classify(sql: &str) -> Self {
        let word = sql
            .trim_start()
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or_default();

        if word.eq_ignore_ascii_case("select") {
            Self::Select
        } else if word.eq_ignore_ascii_case("insert") {
            Self::Insert
        } else if word.eq_ignore_ascii_case("update") {
            Self::Update
        } else if word.eq_ignore_ascii_case("delete") {
            Self::Delete
        } else {
            Self::Other
        }
    }

    /// Only `SELECT` returns rows. Everything else, including unrecognized
    /// statements, runs as a mutation.
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::Select => StatementKind::Query,
            Self::Insert | Self::Update | Self::Delete | Self::Other => StatementKind::Mutation,
        }
    }
}

impl fmt::Display for StatementVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Other => "OTHER",
        };
        f.write_str(name)
    }
}
