//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pools and the named datasource registry
//! - Per-unit-of-work datasource routing
//! - Statement execution and parameter binding
//! - Type mappings from vendor rows to [`Row`](crate::models::Row)
//! - Background health monitoring

#[macro_use]
mod macros;

pub mod executor;
pub mod health;
pub mod params;
pub mod pool;
pub mod registry;
pub mod routing;
pub mod types;

pub use executor::QueryExecutor;
pub use health::HealthMonitor;
pub use pool::{DbConnection, DbPool, HandleSummary, HealthRecord, PooledHandle};
pub use registry::{DataSourceRegistry, HEALTH_PROBE_TIMEOUT};
pub use routing::{RoutingContext, RoutingDataSource, RoutingScope};
pub use types::RowDecode;
