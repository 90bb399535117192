//! Data models for the SQL API gateway.
//!
//! This module re-exports all model types used throughout the application.

pub mod datasource;
pub mod definition;
pub mod execution;
pub mod value;

// Re-export commonly used types
pub use datasource::{DEFAULT_DATASOURCE, DataSourceConfig, DataSourceConfigError, VendorKind};
pub use definition::{
    ApiDefinition, DEFAULT_API_VERSION, DefinitionKey, EncryptMode, PublishStatus,
    normalize_method,
};
pub use execution::{ExecuteOptions, ExecutionResult, Params, QueryParam};
pub use value::{Row, Value};
