//! SQL API Gateway Library
//!
//! Publishes SQL templates as HTTP endpoints. Each API definition binds a
//! (path, method) pair to a `${key}` SQL template; executing it renders the
//! template with request parameters and runs it on a pooled datasource
//! (SQLite, PostgreSQL, MySQL).

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;
pub mod transport;

pub use config::Config;
pub use db::{DataSourceRegistry, RoutingContext, RoutingDataSource};
pub use engine::ExecutionEngine;
pub use error::{GatewayError, GatewayResult};
pub use store::{DefinitionStore, InMemoryDefinitionStore};
