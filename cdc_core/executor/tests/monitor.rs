use catalog::{Getter, MemoryCatalog, Register};
use chrono::{DateTime, Duration, Utc};
use common::naming::ConnectorNames;
use executor::LastSuccessMonitor;
use serde_json::json;
use shared_clients::prometheus::PrometheusClient;
use std::sync::Arc;
use test_utils::fixtures::orders_new_pipeline;
use test_utils::FakeMetrics;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn names(catalog: &MemoryCatalog, pipeline_id: &str) -> ConnectorNames {
    ConnectorNames::for_pipeline(&catalog.resolve_pipeline(pipeline_id).unwrap())
}

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

#[tokio::test]
async fn apply_commit_advances_last_success() {
    let catalog = MemoryCatalog::new();
    let pipeline = catalog.register_pipeline(orders_new_pipeline()).unwrap();
    let names = names(&catalog, &pipeline.id);
    let metrics = FakeMetrics::new();
    metrics.set_commit(&names.apply, Some(at(1_700_000_000)));
    metrics.set_commit(&names.capture, Some(at(1_700_000_900)));
    let monitor = LastSuccessMonitor::new(Arc::new(catalog.clone()), Arc::new(metrics.clone()));

    let updates = monitor.update_all().await.unwrap();

    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].pipeline_id, pipeline.id);
    assert_eq!(updates[0].connector_name, names.apply);
    assert_eq!(
        catalog.get_pipeline(&pipeline.id).unwrap().last_success_at,
        Some(at(1_700_000_000))
    );
    // capture connectors are never asked about
    assert_eq!(metrics.commit_queries(), 1);
}

#[tokio::test]
async fn unchanged_commit_is_not_recorded_twice() {
    let catalog = MemoryCatalog::new();
    let pipeline = catalog.register_pipeline(orders_new_pipeline()).unwrap();
    let apply = names(&catalog, &pipeline.id).apply;
    let metrics = FakeMetrics::new();
    metrics.set_commit(&apply, Some(at(1_700_000_000)));
    let monitor = LastSuccessMonitor::new(Arc::new(catalog.clone()), Arc::new(metrics.clone()));

    assert_eq!(monitor.update_all().await.unwrap().len(), 1);
    assert!(monitor.update_all().await.unwrap().is_empty());

    metrics.set_commit(&apply, Some(at(1_700_000_060)));
    let updates = monitor.update_all().await.unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].last_success_at, at(1_700_000_060));
}

#[tokio::test]
async fn older_commit_never_rewinds_a_build_success() {
    let catalog = MemoryCatalog::new();
    let pipeline = catalog.register_pipeline(orders_new_pipeline()).unwrap();
    catalog.record_run(&pipeline.id, None).unwrap();
    let built_at = catalog.get_pipeline(&pipeline.id).unwrap().last_success_at;
    let metrics = FakeMetrics::new();
    metrics.set_commit(
        &names(&catalog, &pipeline.id).apply,
        Some(Utc::now() - Duration::days(1)),
    );
    let monitor = LastSuccessMonitor::new(Arc::new(catalog.clone()), Arc::new(metrics));

    assert!(monitor.update_all().await.unwrap().is_empty());
    assert_eq!(catalog.get_pipeline(&pipeline.id).unwrap().last_success_at, built_at);
}

#[tokio::test]
async fn unknown_and_failing_connectors_are_skipped() {
    let catalog = MemoryCatalog::new();
    let pipeline = catalog.register_pipeline(orders_new_pipeline()).unwrap();
    let apply = names(&catalog, &pipeline.id).apply;
    let metrics = FakeMetrics::new();
    metrics.set_commit("some-other-connector", Some(at(1_700_000_000)));
    metrics.set_commit("sink.pg_internal.warehouse.public.gone", Some(at(1_700_000_000)));
    metrics.set_commit("sink.pg_internal.warehouse.public.broken", Some(at(1_700_000_000)));
    metrics.fail_for("sink.pg_internal.warehouse.public.broken");
    metrics.set_commit(&apply, None);
    let monitor = LastSuccessMonitor::new(Arc::new(catalog.clone()), Arc::new(metrics));

    let updates = monitor.update_all().await.unwrap();

    assert!(updates.is_empty());
    assert!(catalog.get_pipeline(&pipeline.id).unwrap().last_success_at.is_none());
}

#[tokio::test]
async fn prometheus_commit_metric_updates_catalog() {
    let catalog = MemoryCatalog::new();
    let pipeline = catalog.register_pipeline(orders_new_pipeline()).unwrap();
    let names = names(&catalog, &pipeline.id);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/label/connector/values"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [names.capture, names.apply]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [{"metric": {"connector": names.apply, "task": "0"}, "value": [1700000000.0, "7"]}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let monitor = LastSuccessMonitor::new(
        Arc::new(catalog.clone()),
        Arc::new(PrometheusClient::new(&server.uri())),
    );
    let updates = monitor.update_all().await.unwrap();

    assert_eq!(updates.len(), 1);
    assert_eq!(
        catalog.get_pipeline(&pipeline.id).unwrap().last_success_at,
        Some(at(1_700_000_000))
    );
}
