//! API execution: template rendering, statement classification and dispatch.

pub mod service;
pub mod statement;
pub mod template;

pub use service::ExecutionEngine;
pub use statement::{StatementKind, StatementVerb};
pub use template::{BoundStatement, PlaceholderStyle, SqlTemplate};
