//! Background health monitoring for registered datasources.

use crate::db::registry::DataSourceRegistry;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Periodically probes every handle in a registry.
///
/// The task only holds a `Weak` reference, so it stops on its own once the
/// registry is dropped.
pub struct HealthMonitor;

impl HealthMonitor {
    pub fn spawn(registry: &Arc<DataSourceRegistry>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<DataSourceRegistry> = Arc::downgrade(registry);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so startup is not probed twice.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(registry) = weak.upgrade() else {
                    debug!("Registry dropped, stopping health monitor");
                    break;
                };

                let results = registry.check_all().await;
                let unhealthy: Vec<&str> = results
                    .iter()
                    .filter(|(_, healthy)| !healthy)
                    .map(|(name, _)| name.as_str())
                    .collect();

                if unhealthy.is_empty() {
                    debug!(checked = results.len(), "All datasources healthy");
                } else {
                    warn!(
                        checked = results.len(),
                        unhealthy = ?unhealthy,
                        "Unhealthy datasources detected"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataSourceConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_monitor_records_health() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("master.db");
        let config = DataSourceConfig::new("master", format!("sqlite:{}", path.display())).unwrap();

        let registry = Arc::new(DataSourceRegistry::new());
        let handle = registry.create_or_get(&config).await.unwrap();
        assert!(handle.last_health().is_none());

        let task = HealthMonitor::spawn(&registry, Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(handle.last_health().map(|h| h.healthy), Some(true));
        task.abort();
    }

    #[tokio::test]
    async fn test_monitor_stops_when_registry_dropped() {
        let registry = Arc::new(DataSourceRegistry::new());
        let task = HealthMonitor::spawn(&registry, Duration::from_millis(10));
        drop(registry);

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("monitor should stop")
            .unwrap();
    }
}
