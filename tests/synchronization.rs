//! End-to-end synchronization cycles over the in-memory seams.
//!
//! The real manager, mover and synchronizer run against scripted events
//! APIs, the mock tenant store, the recording write sink and the mock
//! checkpoint store.
//!
//! Run with: cargo test --test synchronization --features test-utils

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tenant_fetcher::checkpoint::MockKubeClient;
use tenant_fetcher::client::{EventApiClient, MockEventApiClient};
use tenant_fetcher::config::{ApiConfig, JobConfig};
use tenant_fetcher::director::RecordingDirectorClient;
use tenant_fetcher::events::EventsType;
use tenant_fetcher::metrics::RecordingMetricsPusher;
use tenant_fetcher::model::TenantType;
use tenant_fetcher::resync::{
    convert_time_to_unix_millis, EventSources, SubaccountMover, SynchronizationJob,
    TenantsManager, TenantsSynchronizer,
};
use tenant_fetcher::storage::MockTenantStore;
use tenant_fetcher::test_utils::{
    events_page, global_account_event, moved_subaccount_event, stored_tenant, subaccount_event,
};
use tenant_fetcher::utils::retry::RetryPolicy;

struct Fixture {
    universal: Arc<MockEventApiClient>,
    regional: HashMap<String, Arc<MockEventApiClient>>,
    store: MockTenantStore,
    director: Arc<RecordingDirectorClient>,
    kube: Arc<MockKubeClient>,
    metrics: Arc<RecordingMetricsPusher>,
    synchronizer: Arc<TenantsSynchronizer>,
}

fn job_config(tenant_type: TenantType, regions: &[&str]) -> JobConfig {
    let mut config = JobConfig {
        tenant_type,
        tenant_provider: "registry".to_string(),
        ..Default::default()
    };
    for region in regions {
        config.events.regions.insert(
            region.to_string(),
            ApiConfig {
                region_name: region.to_string(),
                ..Default::default()
            },
        );
    }
    config
}

fn fixture(config: JobConfig, last_run: &str) -> Fixture {
    let universal = Arc::new(MockEventApiClient::new().with_provider("registry"));
    let regional: HashMap<String, Arc<MockEventApiClient>> = config
        .events
        .regions
        .keys()
        .map(|r| (r.clone(), Arc::new(MockEventApiClient::new().with_provider("registry"))))
        .collect();
    let store = MockTenantStore::new();
    let director = Arc::new(RecordingDirectorClient::new());
    let recent_resync = convert_time_to_unix_millis(chrono::Utc::now());
    let kube = Arc::new(MockKubeClient::new(last_run, &recent_resync));
    let metrics = Arc::new(RecordingMetricsPusher::new());

    let regional_clients: HashMap<String, Arc<dyn EventApiClient>> = regional
        .iter()
        .map(|(r, c)| (r.clone(), c.clone() as Arc<dyn EventApiClient>))
        .collect();
    let sources = EventSources::new(universal.clone(), regional_clients, &config.events)
        .with_retry(RetryPolicy::immediate(2));

    let manager =
        Arc::new(TenantsManager::new(&config, sources.clone(), director.clone()).unwrap());
    let mover = Arc::new(SubaccountMover::new(
        sources,
        Arc::new(store.clone()),
        director.clone(),
    ));
    let synchronizer = Arc::new(TenantsSynchronizer::new(
        &config,
        Arc::new(store.clone()),
        manager.clone(),
        mover,
        manager,
        kube.clone(),
        metrics.clone(),
    ));

    Fixture {
        universal,
        regional,
        store,
        director,
        kube,
        metrics,
        synchronizer,
    }
}

#[tokio::test]
async fn test_created_account_is_written_with_region() {
    let f = fixture(job_config(TenantType::Account, &["eu-1"]), "1000");
    f.store
        .add_tenant(stored_tenant("cust-id", "cust-1", None, TenantType::Customer))
        .await;
    f.universal
        .add_page(
            EventsType::CreatedAccount,
            events_page(vec![global_account_event("ga-1", "cust-1")]),
        )
        .await;

    f.synchronizer.synchronize().await.unwrap();

    let written = f.director.written().await;
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].external_tenant, "ga-1");
    assert_eq!(written[0].parent.as_deref(), Some("cust-id"));
    assert_eq!(written[0].region.as_deref(), Some("eu-1"));
    assert_eq!(written[0].provider, "registry");
    assert_eq!(f.kube.update_count().await, 1);

    let (_, params) = &f.universal.calls().await[0];
    assert_eq!(params["timestamp"], "1000");
    assert_eq!(params["region"], "eu-1");
}

#[tokio::test]
async fn test_created_then_deleted_tenant_is_only_deleted() {
    let f = fixture(job_config(TenantType::Account, &["eu-1"]), "1000");
    f.store
        .add_tenant(stored_tenant("t1-id", "t1", None, TenantType::Account))
        .await;
    f.universal
        .add_page(
            EventsType::CreatedAccount,
            events_page(vec![global_account_event("t1", "")]),
        )
        .await;
    f.universal
        .add_page(
            EventsType::DeletedAccount,
            events_page(vec![global_account_event("t1", "")]),
        )
        .await;

    f.synchronizer.synchronize().await.unwrap();

    assert!(f.director.written_batches().await.is_empty());
    let deleted = f.director.deleted().await;
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].external_tenant, "t1");
}

#[tokio::test]
async fn test_subaccount_with_unknown_parent_creates_parent_first() {
    let f = fixture(job_config(TenantType::Subaccount, &["eu-1"]), "1000");
    f.regional["eu-1"]
        .add_page(
            EventsType::CreatedSubaccount,
            events_page(vec![subaccount_event("s1", "p1", "eu-1")]),
        )
        .await;

    f.synchronizer.synchronize().await.unwrap();

    let batches = f.director.written_batches().await;
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].external_tenant, "p1");
    assert_eq!(batch[0].tenant_type, TenantType::Account);
    assert_eq!(batch[1].external_tenant, "s1");
    assert_eq!(batch[1].parent.as_deref(), Some("p1"));
    assert_eq!(batch[1].tenant_type, TenantType::Subaccount);
}

#[tokio::test]
async fn test_failed_delete_leaves_checkpoint_unchanged() {
    let f = fixture(job_config(TenantType::Account, &["eu-1"]), "1000");
    let before = f.kube.data().await;
    f.store
        .add_tenant(stored_tenant("t1-id", "t1", None, TenantType::Account))
        .await;
    f.universal
        .add_page(
            EventsType::DeletedAccount,
            events_page(vec![global_account_event("t1", "")]),
        )
        .await;
    f.director.set_fail_on_delete(true).await;

    let err = f.synchronizer.synchronize().await.unwrap_err();

    assert!(err.to_string().starts_with("while deleting tenants"));
    assert_eq!(f.kube.data().await, before);
    assert_eq!(f.kube.update_count().await, 0);
    assert_eq!(f.metrics.failures().len(), 1);
}

#[tokio::test]
async fn test_moved_subaccount_is_reparented() {
    let f = fixture(job_config(TenantType::Subaccount, &["eu-1"]), "1000");
    f.store
        .add_tenant(stored_tenant("src-id", "ga-src", None, TenantType::Account))
        .await;
    f.store
        .add_tenant(stored_tenant("dst-id", "ga-dst", None, TenantType::Account))
        .await;
    f.store
        .add_tenant(stored_tenant("sa-id", "sa-1", Some("src-id"), TenantType::Subaccount))
        .await;
    f.universal
        .add_page(
            EventsType::MovedSubaccount,
            events_page(vec![moved_subaccount_event("sa-1", "ga-src", "ga-dst")]),
        )
        .await;

    f.synchronizer.synchronize().await.unwrap();

    let updated = f.director.updated().await;
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].0, "sa-id");
    assert_eq!(updated[0].1.parent.as_deref(), Some("ga-dst"));
}

#[tokio::test]
async fn test_transient_fetch_failure_is_retried() {
    let f = fixture(job_config(TenantType::Account, &[]), "1000");
    f.universal
        .add_page(
            EventsType::CreatedAccount,
            events_page(vec![global_account_event("ga-1", "")]),
        )
        .await;
    f.universal.fail_next(EventsType::CreatedAccount, 1).await;

    f.synchronizer.synchronize().await.unwrap();

    assert_eq!(f.director.written().await.len(), 1);
}

#[tokio::test]
async fn test_synchronize_tenant_found_in_region() {
    let f = fixture(job_config(TenantType::Subaccount, &["eu-1", "us-1"]), "1000");
    f.store
        .add_tenant(stored_tenant("ga-id", "ga-1", None, TenantType::Account))
        .await;
    f.regional["us-1"]
        .add_page(
            EventsType::CreatedSubaccount,
            events_page(vec![subaccount_event("sa-1", "ga-1", "us-1")]),
        )
        .await;

    f.synchronizer
        .synchronize_tenant("ga-1", "sa-1")
        .await
        .unwrap();

    let written = f.director.written().await;
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].external_tenant, "sa-1");
    assert_eq!(written[0].parent.as_deref(), Some("ga-id"));
}

#[tokio::test]
async fn test_job_stops_on_shutdown() {
    let f = fixture(job_config(TenantType::Account, &[]), "1000");
    let job = SynchronizationJob::new(f.synchronizer.clone()).with_interval(Duration::from_millis(10));

    tokio::time::timeout(
        Duration::from_secs(5),
        job.run_until(tokio::time::sleep(Duration::from_millis(50))),
    )
    .await
    .expect("job must stop after shutdown");

    assert!(f.kube.update_count().await >= 1);
}

#[tokio::test]
async fn test_job_run_once_reports_outcome() {
    let f = fixture(job_config(TenantType::Account, &[]), "1000");
    let job = SynchronizationJob::new(f.synchronizer.clone());

    assert!(job.run_once().await);

    f.kube.set_fail_on_update(true).await;
    assert!(!job.run_once().await);
}
