//! SQL API Gateway - Main entry point.
//!
//! Registers the configured datasources, loads API definitions and serves
//! them over HTTP until SIGINT or SIGTERM.

use clap::Parser;
use sql_api_gateway::config::Config;
use sql_api_gateway::db::{DataSourceRegistry, HealthMonitor, QueryExecutor, RoutingDataSource};
use sql_api_gateway::engine::ExecutionEngine;
use sql_api_gateway::models::DEFAULT_DATASOURCE;
use sql_api_gateway::store::InMemoryDefinitionStore;
use sql_api_gateway::transport::{HttpTransport, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!("Starting SQL API Gateway v{}", env!("CARGO_PKG_VERSION"));

    let ds_configs = config.parse_datasources()?;
    let registry = Arc::new(DataSourceRegistry::new());

    // A datasource that fails to connect is logged and skipped; the gateway
    // still serves requests for the others.
    for ds_config in &ds_configs {
        if !ds_config.enabled {
            info!(datasource = %ds_config.name, "Datasource disabled, skipping");
            continue;
        }
        info!(
            datasource = %ds_config.name,
            vendor = %ds_config.vendor,
            url = %ds_config.masked_url(),
            "Registering datasource"
        );
        if let Err(e) = registry.create_or_get(ds_config).await {
            error!(
                datasource = %ds_config.name,
                error = %e,
                suggestion = e.suggestion().unwrap_or_default(),
                "Failed to register datasource"
            );
        }
    }

    if !registry.contains(DEFAULT_DATASOURCE).await {
        warn!(
            "No '{}' datasource registered; API executions will fail until one is configured",
            DEFAULT_DATASOURCE
        );
    }

    let store = match &config.definitions {
        Some(path) => InMemoryDefinitionStore::load_from_file(path).await?,
        None => {
            warn!("No definitions file given; starting with an empty definition store");
            InMemoryDefinitionStore::new()
        }
    };

    let executor = match config.query_timeout_duration() {
        Some(limit) => QueryExecutor::with_timeout(limit),
        None => QueryExecutor::new(),
    };
    let router = RoutingDataSource::new(Arc::clone(&registry));
    let engine = Arc::new(ExecutionEngine::new(Arc::new(store), router).with_executor(executor));

    let monitor = config
        .health_interval_duration()
        .map(|interval| HealthMonitor::spawn(&registry, interval));

    info!(
        host = %config.http_host,
        port = config.http_port,
        "Using HTTP transport"
    );
    let transport = HttpTransport::new(engine, registry, &config.http_host, config.http_port);
    let result = transport.run().await;

    if let Some(monitor) = monitor {
        monitor.abort();
    }

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
