//! SQLite tenant store integration tests.
//!
//! Run with: cargo test --test storage_sqlite --features sqlite,test-utils
//!
//! Each test uses its own database file in a temporary directory. The store
//! serves as both the transactional reader and the direct write sink.

#![cfg(feature = "sqlite")]

use std::collections::HashMap;
use std::sync::Arc;

use tempfile::TempDir;

use tenant_fetcher::checkpoint::MockKubeClient;
use tenant_fetcher::client::{EventApiClient, MockEventApiClient};
use tenant_fetcher::config::{JobConfig, StorageConfig};
use tenant_fetcher::director::DirectorGraphQLClient;
use tenant_fetcher::events::EventsType;
use tenant_fetcher::metrics::RecordingMetricsPusher;
use tenant_fetcher::model::{BusinessTenantMapping, GraphQLTenantInput, TenantType};
use tenant_fetcher::resync::{
    convert_time_to_unix_millis, EventSources, SubaccountMover, TenantsManager,
    TenantsSynchronizer,
};
use tenant_fetcher::storage::{SqliteTenantStore, StorageError, Transactioner};
use tenant_fetcher::test_utils::{
    events_page, global_account_event, moved_subaccount_event, subaccount_event,
};
use tenant_fetcher::utils::retry::RetryPolicy;

async fn connect(dir: &TempDir) -> SqliteTenantStore {
    let path = dir.path().join("tenants.db");
    let config = StorageConfig {
        database_url: format!("sqlite://{}?mode=rwc", path.display()),
        max_connections: 4,
    };
    SqliteTenantStore::connect(&config)
        .await
        .expect("Failed to open SQLite store")
}

fn synchronizer(
    tenant_type: TenantType,
    store: &SqliteTenantStore,
    universal: Arc<MockEventApiClient>,
) -> TenantsSynchronizer {
    let config = JobConfig {
        tenant_type,
        tenant_provider: "registry".to_string(),
        ..Default::default()
    };
    let sources = EventSources::new(
        universal as Arc<dyn EventApiClient>,
        HashMap::new(),
        &config.events,
    )
    .with_retry(RetryPolicy::immediate(1));

    let director: Arc<dyn DirectorGraphQLClient> = Arc::new(store.clone());
    let transact: Arc<dyn Transactioner> = Arc::new(store.clone());
    let manager = Arc::new(TenantsManager::new(&config, sources.clone(), director.clone()).unwrap());
    let mover = Arc::new(SubaccountMover::new(sources, transact.clone(), director));
    let recent_resync = convert_time_to_unix_millis(chrono::Utc::now());

    TenantsSynchronizer::new(
        &config,
        transact,
        manager.clone(),
        mover,
        manager,
        Arc::new(MockKubeClient::new("1000", &recent_resync)),
        Arc::new(RecordingMetricsPusher::new()),
    )
}

fn tenant(external: &str, parent: Option<&str>, tenant_type: TenantType) -> GraphQLTenantInput {
    GraphQLTenantInput {
        name: external.to_string(),
        external_tenant: external.to_string(),
        parent: parent.map(str::to_string),
        tenant_type,
        provider: "registry".to_string(),
        subdomain: None,
        region: None,
        license_type: None,
        customer_id: None,
    }
}

fn by_external<'a>(tenants: &'a [BusinessTenantMapping], external: &str) -> &'a BusinessTenantMapping {
    tenants
        .iter()
        .find(|t| t.external_tenant == external)
        .unwrap_or_else(|| panic!("tenant {} not stored", external))
}

/// Stores `ga-src`, `ga-dst` and `sa-1` under `ga-src`.
async fn seed_move_fixture(store: &SqliteTenantStore) {
    store
        .write_tenants(&[
            tenant("ga-src", None, TenantType::Account),
            tenant("ga-dst", None, TenantType::Account),
            tenant("sa-1", Some("ga-src"), TenantType::Subaccount),
        ])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_sqlite_created_subaccount_stores_parent_first() {
    let dir = TempDir::new().unwrap();
    let store = connect(&dir).await;
    let universal = Arc::new(MockEventApiClient::new().with_provider("registry"));
    universal
        .add_page(
            EventsType::CreatedSubaccount,
            events_page(vec![subaccount_event("s1", "p1", "eu-1")]),
        )
        .await;

    synchronizer(TenantType::Subaccount, &store, universal)
        .synchronize()
        .await
        .unwrap();

    let tenants = store.tenants().await.unwrap();
    assert_eq!(tenants.len(), 2);
    let parent = by_external(&tenants, "p1");
    let child = by_external(&tenants, "s1");
    assert_eq!(parent.tenant_type, TenantType::Account);
    assert_eq!(child.tenant_type, TenantType::Subaccount);
    assert_eq!(child.parent.as_deref(), Some(parent.id.as_str()));
}

#[tokio::test]
async fn test_sqlite_created_account_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = connect(&dir).await;
    let universal = Arc::new(MockEventApiClient::new().with_provider("registry"));
    universal
        .add_page(
            EventsType::CreatedAccount,
            events_page(vec![global_account_event("ga-1", "")]),
        )
        .await;
    let sync = synchronizer(TenantType::Account, &store, universal);

    sync.synchronize().await.unwrap();
    let first = store.tenants().await.unwrap();
    sync.synchronize().await.unwrap();
    let second = store.tenants().await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_sqlite_deleted_account_is_removed() {
    let dir = TempDir::new().unwrap();
    let store = connect(&dir).await;
    store
        .write_tenants(&[
            tenant("ga-1", None, TenantType::Account),
            tenant("ga-2", None, TenantType::Account),
        ])
        .await
        .unwrap();
    let universal = Arc::new(MockEventApiClient::new().with_provider("registry"));
    universal
        .add_page(
            EventsType::DeletedAccount,
            events_page(vec![global_account_event("ga-1", "")]),
        )
        .await;

    synchronizer(TenantType::Account, &store, universal)
        .synchronize()
        .await
        .unwrap();

    let tenants = store.tenants().await.unwrap();
    assert_eq!(tenants.len(), 1);
    assert_eq!(tenants[0].external_tenant, "ga-2");
}

#[tokio::test]
async fn test_sqlite_moved_subaccount_is_reparented() {
    let dir = TempDir::new().unwrap();
    let store = connect(&dir).await;
    seed_move_fixture(&store).await;
    let universal = Arc::new(MockEventApiClient::new().with_provider("registry"));
    universal
        .add_page(
            EventsType::MovedSubaccount,
            events_page(vec![moved_subaccount_event("sa-1", "ga-src", "ga-dst")]),
        )
        .await;

    synchronizer(TenantType::Subaccount, &store, universal)
        .synchronize()
        .await
        .unwrap();

    let tenants = store.tenants().await.unwrap();
    let target = by_external(&tenants, "ga-dst");
    let moved = by_external(&tenants, "sa-1");
    assert_eq!(moved.parent.as_deref(), Some(target.id.as_str()));
}

#[tokio::test]
async fn test_sqlite_move_blocked_by_scenario() {
    let dir = TempDir::new().unwrap();
    let store = connect(&dir).await;
    seed_move_fixture(&store).await;
    let tenants = store.tenants().await.unwrap();
    let source_id = by_external(&tenants, "ga-src").id.clone();
    let subaccount_id = by_external(&tenants, "sa-1").id.clone();
    store
        .add_runtime(&subaccount_id, "rt-1", "runtime-1")
        .await
        .unwrap();
    store
        .set_runtime_scenarios(&source_id, "rt-1", &["DEFAULT", "production"])
        .await
        .unwrap();

    let universal = Arc::new(MockEventApiClient::new().with_provider("registry"));
    universal
        .add_page(
            EventsType::MovedSubaccount,
            events_page(vec![moved_subaccount_event("sa-1", "ga-src", "ga-dst")]),
        )
        .await;

    let err = synchronizer(TenantType::Subaccount, &store, universal)
        .synchronize()
        .await
        .unwrap_err();

    assert!(err.to_string().contains("scenario production"));
    let tenants = store.tenants().await.unwrap();
    assert_eq!(
        by_external(&tenants, "sa-1").parent.as_deref(),
        Some(source_id.as_str())
    );
}

#[tokio::test]
async fn test_sqlite_move_with_default_scenario_is_allowed() {
    let dir = TempDir::new().unwrap();
    let store = connect(&dir).await;
    seed_move_fixture(&store).await;
    let tenants = store.tenants().await.unwrap();
    let source_id = by_external(&tenants, "ga-src").id.clone();
    let subaccount_id = by_external(&tenants, "sa-1").id.clone();
    store
        .add_runtime(&subaccount_id, "rt-1", "runtime-1")
        .await
        .unwrap();
    store
        .set_runtime_scenarios(&source_id, "rt-1", &["DEFAULT"])
        .await
        .unwrap();

    let universal = Arc::new(MockEventApiClient::new().with_provider("registry"));
    universal
        .add_page(
            EventsType::MovedSubaccount,
            events_page(vec![moved_subaccount_event("sa-1", "ga-src", "ga-dst")]),
        )
        .await;

    synchronizer(TenantType::Subaccount, &store, universal)
        .synchronize()
        .await
        .unwrap();

    let tenants = store.tenants().await.unwrap();
    let target_id = by_external(&tenants, "ga-dst").id.clone();
    assert_eq!(
        by_external(&tenants, "sa-1").parent.as_deref(),
        Some(target_id.as_str())
    );
}

#[tokio::test]
async fn test_sqlite_transaction_reads() {
    let dir = TempDir::new().unwrap();
    let store = connect(&dir).await;
    seed_move_fixture(&store).await;

    let mut tx = store.begin().await.unwrap();
    let listed = tx
        .list_by_external_ids(&["ga-src".to_string(), "missing".to_string()])
        .await
        .unwrap();
    let missing = tx.get_by_external_id("missing").await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].external_tenant, "ga-src");
    assert!(missing.is_none());
    assert!(matches!(
        tx.commit().await,
        Err(StorageError::TransactionClosed)
    ));
}

#[tokio::test]
async fn test_sqlite_unknown_parent_is_written_without_parent() {
    let dir = TempDir::new().unwrap();
    let store = connect(&dir).await;

    store
        .write_tenants(&[tenant("sa-1", Some("nowhere"), TenantType::Subaccount)])
        .await
        .unwrap();

    let tenants = store.tenants().await.unwrap();
    assert!(by_external(&tenants, "sa-1").parent.is_none());
}

#[tokio::test]
async fn test_sqlite_move_with_single_connection_pool() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig {
        database_url: format!("sqlite://{}?mode=rwc", dir.path().join("tenants.db").display()),
        max_connections: 1,
    };
    let store = SqliteTenantStore::connect(&config).await.unwrap();
    seed_move_fixture(&store).await;
    let universal = Arc::new(MockEventApiClient::new().with_provider("registry"));
    universal
        .add_page(
            EventsType::MovedSubaccount,
            events_page(vec![moved_subaccount_event("sa-1", "ga-src", "ga-dst")]),
        )
        .await;

    let sync = synchronizer(TenantType::Subaccount, &store, universal);
    tokio::time::timeout(std::time::Duration::from_secs(10), sync.synchronize())
        .await
        .expect("move must not wait on the pool")
        .unwrap();

    let tenants = store.tenants().await.unwrap();
    let target = by_external(&tenants, "ga-dst");
    assert_eq!(
        by_external(&tenants, "sa-1").parent.as_deref(),
        Some(target.id.as_str())
    );
}
