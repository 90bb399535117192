//! Integration tests for the datasource registry.
//!
//! Tests verify that:
//! - Repeated and concurrent registration yields one shared pool per name
//! - Replacement, removal and cache clearing close the pools they drop
//! - Health and connection checks collapse every fault into `false`

use sql_api_gateway::GatewayError;
use sql_api_gateway::db::DataSourceRegistry;
use sql_api_gateway::models::DataSourceConfig;
use std::sync::Arc;
use tempfile::TempDir;

fn sqlite_config(dir: &TempDir, name: &str) -> DataSourceConfig {
    let path = dir.path().join(format!("{name}.db"));
    DataSourceConfig::new(name, format!("sqlite:{}", path.display())).unwrap()
}

/// A SQLite file inside a directory that does not exist cannot be opened.
fn unreachable_config(dir: &TempDir, name: &str) -> DataSourceConfig {
    let path = dir.path().join("missing").join("nested").join("db.sqlite");
    DataSourceConfig::new(name, format!("sqlite:{}", path.display())).unwrap()
}

#[tokio::test]
async fn test_create_or_get_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let registry = DataSourceRegistry::new();
    let config = sqlite_config(&dir, "master");

    let first = registry.create_or_get(&config).await.unwrap();
    let second = registry.create_or_get(&config).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn test_cached_handle_returned_without_diffing() {
    let dir = TempDir::new().unwrap();
    let registry = DataSourceRegistry::new();

    let first = registry
        .create_or_get(&sqlite_config(&dir, "master"))
        .await
        .unwrap();
    // Same name, different target: the cached handle wins
    let other = DataSourceConfig::new("master", format!("sqlite:{}", dir.path().join("other.db").display())).unwrap();
    let second = registry.create_or_get(&other).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_concurrent_first_registration_builds_one_pool() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(DataSourceRegistry::new());
    let config = sqlite_config(&dir, "master");

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let config = config.clone();
            tokio::spawn(async move { registry.create_or_get(&config).await.unwrap() })
        })
        .collect();

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap());
    }

    assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    assert_eq!(registry.names().await, vec!["master"]);
}

#[tokio::test]
async fn test_failed_creation_caches_nothing() {
    let dir = TempDir::new().unwrap();
    let registry = DataSourceRegistry::new();
    let config = unreachable_config(&dir, "master");

    let err = registry.create_or_get(&config).await.unwrap_err();
    assert!(matches!(err, GatewayError::DataSourceInitFailed { .. }));
    assert!(err.suggestion().is_some());
    assert!(!registry.contains("master").await);

    // A later good config under the same name succeeds
    let handle = registry
        .create_or_get(&sqlite_config(&dir, "master"))
        .await
        .unwrap();
    assert_eq!(handle.name(), "master");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_success_after_concurrent_failure_stays_cached() {
    let dir = TempDir::new().unwrap();

    for _ in 0..50 {
        let registry = Arc::new(DataSourceRegistry::new());
        let failing = {
            let registry = Arc::clone(&registry);
            let config = unreachable_config(&dir, "master");
            tokio::spawn(async move { registry.create_or_get(&config).await })
        };
        let succeeding = {
            let registry = Arc::clone(&registry);
            let config = sqlite_config(&dir, "master");
            tokio::spawn(async move { registry.create_or_get(&config).await })
        };

        let _ = failing.await.unwrap();
        // Either the good config built the pool, or it raced the cached
        // failure; whichever handle it got must be the cached one.
        if let Ok(handle) = succeeding.await.unwrap() {
            let cached = registry.get("master").await.expect("handle must be cached");
            assert!(Arc::ptr_eq(&handle, &cached));
        }
        registry.clear_cache().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_clear_cache_during_creation_leaves_no_open_pool() {
    let dir = TempDir::new().unwrap();

    for _ in 0..50 {
        let registry = Arc::new(DataSourceRegistry::new());
        let creating = {
            let registry = Arc::clone(&registry);
            let config = sqlite_config(&dir, "master");
            tokio::spawn(async move { registry.create_or_get(&config).await })
        };
        tokio::task::yield_now().await;
        registry.clear_cache().await;

        if let Ok(handle) = creating.await.unwrap() {
            let cached = registry.get("master").await;
            let tracked = cached.is_some_and(|cached| Arc::ptr_eq(&cached, &handle));
            assert!(tracked || handle.is_closed());
        }
        registry.clear_cache().await;
    }
}

#[tokio::test]
async fn test_vendor_without_driver_fails() {
    let registry = DataSourceRegistry::new();
    let config = DataSourceConfig::new("legacy", "jdbc:oracle:thin:@db:1521:orcl").unwrap();

    let err = registry.create_or_get(&config).await.unwrap_err();
    assert!(err.to_string().contains("no driver available"));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_register_replaces_and_closes_old_pool() {
    let dir = TempDir::new().unwrap();
    let registry = DataSourceRegistry::new();
    let config = sqlite_config(&dir, "master");

    let old = registry.create_or_get(&config).await.unwrap();
    let new = registry.register(&config).await.unwrap();

    assert!(!Arc::ptr_eq(&old, &new));
    assert!(old.is_closed());
    assert!(!new.is_closed());
    let current = registry.get("master").await.unwrap();
    assert!(Arc::ptr_eq(&current, &new));
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn test_remove_closes_pool() {
    let dir = TempDir::new().unwrap();
    let registry = DataSourceRegistry::new();
    let handle = registry
        .create_or_get(&sqlite_config(&dir, "slave"))
        .await
        .unwrap();

    assert!(registry.remove("slave").await);
    assert!(handle.is_closed());
    assert!(registry.get("slave").await.is_none());
    assert!(!registry.remove("slave").await);
}

#[tokio::test]
async fn test_clear_cache_closes_everything() {
    let dir = TempDir::new().unwrap();
    let registry = DataSourceRegistry::new();
    let master = registry
        .create_or_get(&sqlite_config(&dir, "master"))
        .await
        .unwrap();
    let slave = registry
        .create_or_get(&sqlite_config(&dir, "slave"))
        .await
        .unwrap();
    assert_eq!(registry.names().await, vec!["master", "slave"]);

    registry.clear_cache().await;

    assert!(registry.is_empty().await);
    assert!(master.is_closed());
    assert!(slave.is_closed());
}

#[tokio::test]
async fn test_health_check_records_result() {
    let dir = TempDir::new().unwrap();
    let registry = DataSourceRegistry::new();
    let config = sqlite_config(&dir, "master");

    // Creates the handle on first use
    assert!(registry.health_check(&config).await);

    let summaries = registry.summaries().await;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].healthy, Some(true));
    assert!(summaries[0].last_check.is_some());
}

#[tokio::test]
async fn test_health_check_never_fails() {
    let dir = TempDir::new().unwrap();
    let registry = DataSourceRegistry::new();

    assert!(!registry.health_check(&unreachable_config(&dir, "master")).await);
    assert!(!registry.health_check(&sqlite_config(&dir, "off").with_enabled(false)).await);

    let bad_probe = sqlite_config(&dir, "probe").with_validation_query("SELECT * FROM nowhere");
    assert!(!registry.health_check(&bad_probe).await);
}

#[tokio::test]
async fn test_connection_check_leaves_cache_untouched() {
    let dir = TempDir::new().unwrap();
    let registry = DataSourceRegistry::new();

    assert!(registry.test_connection(&sqlite_config(&dir, "candidate")).await);
    assert!(!registry.test_connection(&unreachable_config(&dir, "broken")).await);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_check_all_reports_each_handle() {
    let dir = TempDir::new().unwrap();
    let registry = DataSourceRegistry::new();
    registry
        .create_or_get(&sqlite_config(&dir, "master"))
        .await
        .unwrap();
    registry
        .create_or_get(&sqlite_config(&dir, "report").with_validation_query("SELECT * FROM nowhere"))
        .await
        .unwrap();

    let results = registry.check_all().await;
    assert_eq!(
        results,
        vec![("master".to_string(), true), ("report".to_string(), false)]
    );
}
