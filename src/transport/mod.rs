//! Transport layer for the SQL API gateway.
//!
//! Published APIs are served over HTTP; see [`HttpTransport`].

pub mod http;

pub use http::{AppState, HttpTransport, router};

use crate::error::GatewayResult;
use std::future::Future;

/// Trait for gateway transport implementations.
pub trait Transport: Send + Sync {
    /// Start the transport and begin handling requests.
    ///
    /// This method should block until the transport is shut down.
    fn run(&self) -> impl Future<Output = GatewayResult<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}
