use catalog::{Getter, MemoryCatalog, Register};
use common::naming::ConnectorNames;
use common::types::{ConnectorRole, SummaryStatus};
use executor::{StatusEventKind, StatusReconciliationStream, Subscription};
use shared_clients::kafka::ConnectorState;
use std::sync::Arc;
use std::time::Duration;
use test_utils::fixtures::{mssql_new_pipeline, orders_new_pipeline};
use test_utils::FakeConnectorCluster;

struct Fixture {
    catalog: MemoryCatalog,
    cluster: FakeConnectorCluster,
    stream: StatusReconciliationStream,
    orders: ConnectorNames,
    orders_id: String,
}

/// The background poller is kept out of the way; ticks are driven by hand.
fn fixture() -> Fixture {
    let catalog = MemoryCatalog::new();
    let cluster = FakeConnectorCluster::new();
    let pipeline = catalog.register_pipeline(orders_new_pipeline()).unwrap();
    let orders = ConnectorNames::for_pipeline(&catalog.resolve_pipeline(&pipeline.id).unwrap());
    cluster.set_state(&orders.capture, ConnectorState::Running, vec![ConnectorState::Running]);
    cluster.set_state(&orders.apply, ConnectorState::Running, vec![ConnectorState::Running]);

    let stream = StatusReconciliationStream::with_poll_interval(
        Arc::new(cluster.clone()),
        Arc::new(catalog.clone()),
        Duration::from_secs(3600),
    );
    Fixture {
        catalog,
        cluster,
        stream,
        orders,
        orders_id: pipeline.id,
    }
}

fn drain(subscription: &mut Subscription) -> Vec<executor::StatusEvent> {
    let mut events = Vec::new();
    while let Ok(event) = subscription.events.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn new_subscriber_gets_a_full_snapshot() {
    let f = fixture();

    let mut sub = f.stream.subscribe([f.orders_id.clone()]).await;

    let events = drain(&mut sub);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, StatusEventKind::Snapshot);
    let group = events[0].pipeline(&f.orders_id).unwrap();
    assert_eq!(group.connectors.len(), 2);
    assert_eq!(group.connectors[0].role, ConnectorRole::Capture);
    assert!(group
        .connectors
        .iter()
        .all(|c| c.summary == SummaryStatus::Running));
    assert_eq!(
        f.stream.watched_connectors(),
        vec![f.orders.capture.clone(), f.orders.apply.clone()]
    );
}

#[tokio::test]
async fn one_change_reaches_every_watching_subscriber_once() {
    let f = fixture();
    let mut first = f.stream.subscribe([f.orders_id.clone()]).await;
    let mut second = f.stream.subscribe([f.orders_id.clone()]).await;
    drain(&mut first);
    drain(&mut second);

    assert_eq!(f.stream.tick().await, 0);

    f.cluster
        .set_state(&f.orders.capture, ConnectorState::Paused, vec![ConnectorState::Paused]);
    assert_eq!(f.stream.tick().await, 1);
    assert_eq!(f.stream.tick().await, 0);

    for sub in [&mut first, &mut second] {
        let events = drain(sub);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, StatusEventKind::Delta);
        assert_eq!(events[0].connector_count(), 1);
        let report = &events[0].pipeline(&f.orders_id).unwrap().connectors[0];
        assert_eq!(report.connector_name, f.orders.capture);
        assert_eq!(report.summary, SummaryStatus::Paused);
    }
}

#[tokio::test]
async fn deltas_only_go_to_subscribers_of_that_pipeline() {
    let f = fixture();
    let sales = f.catalog.register_pipeline(mssql_new_pipeline()).unwrap();
    let mut orders_sub = f.stream.subscribe([f.orders_id.clone()]).await;
    let mut sales_sub = f.stream.subscribe([sales.id.clone()]).await;
    drain(&mut orders_sub);
    drain(&mut sales_sub);
    assert_eq!(f.stream.watched_connectors().len(), 4);

    f.cluster.set_state(
        &f.orders.apply,
        ConnectorState::Running,
        vec![ConnectorState::Running, ConnectorState::Failed],
    );
    f.stream.tick().await;

    let orders_events = drain(&mut orders_sub);
    assert_eq!(orders_events.len(), 1);
    assert_eq!(
        orders_events[0].pipelines[0].connectors[0].summary,
        SummaryStatus::PartiallyFailed
    );
    assert!(drain(&mut sales_sub).is_empty());
}

#[tokio::test]
async fn absent_connector_is_reported_undefined() {
    let f = fixture();
    f.cluster.remove(&f.orders.apply);

    let mut sub = f.stream.subscribe([f.orders_id.clone()]).await;

    let snapshot = drain(&mut sub).remove(0);
    let apply = snapshot.pipelines[0]
        .connectors
        .iter()
        .find(|c| c.role == ConnectorRole::Apply)
        .unwrap();
    assert_eq!(apply.summary, SummaryStatus::Undefined);
    assert!(apply.status.is_none());
}

#[tokio::test]
async fn fetch_errors_skip_only_the_failing_connector() {
    let f = fixture();
    let mut sub = f.stream.subscribe([f.orders_id.clone()]).await;
    drain(&mut sub);

    f.cluster.fail_for(&f.orders.capture);
    f.cluster
        .set_state(&f.orders.apply, ConnectorState::Failed, vec![ConnectorState::Failed]);
    assert_eq!(f.stream.tick().await, 1);

    let events = drain(&mut sub);
    let connectors = &events[0].pipelines[0].connectors;
    assert_eq!(connectors.len(), 1);
    assert_eq!(connectors[0].connector_name, f.orders.apply);
    assert_eq!(connectors[0].summary, SummaryStatus::Failed);
}

#[tokio::test]
async fn emptying_the_subscriber_set_clears_cached_state() {
    let f = fixture();
    let first = f.stream.subscribe([f.orders_id.clone()]).await;
    let second = f.stream.subscribe([f.orders_id.clone()]).await;

    f.stream.unsubscribe(first.id);
    assert_eq!(f.stream.watched_connectors().len(), 2);
    f.stream.unsubscribe(second.id);
    assert_eq!(f.stream.subscriber_count(), 0);
    assert!(f.stream.watched_connectors().is_empty());

    f.cluster
        .set_state(&f.orders.capture, ConnectorState::Paused, vec![ConnectorState::Paused]);
    let mut fresh = f.stream.subscribe([f.orders_id.clone()]).await;

    let events = drain(&mut fresh);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, StatusEventKind::Snapshot);
    assert_eq!(events[0].connector_count(), 2);
    assert_eq!(f.stream.tick().await, 0);
}

#[tokio::test]
async fn dropped_receivers_are_pruned_on_tick() {
    let f = fixture();
    let gone = f.stream.subscribe([f.orders_id.clone()]).await;
    let kept = f.stream.subscribe([f.orders_id.clone()]).await;
    drop(gone);

    f.stream.tick().await;
    assert_eq!(f.stream.subscriber_count(), 1);

    drop(kept);
    f.stream.tick().await;
    assert_eq!(f.stream.subscriber_count(), 0);
    assert!(f.stream.watched_connectors().is_empty());
}

#[tokio::test]
async fn background_poller_delivers_deltas() {
    let catalog = MemoryCatalog::new();
    let cluster = FakeConnectorCluster::new();
    let pipeline = catalog.register_pipeline(orders_new_pipeline()).unwrap();
    let names = ConnectorNames::for_pipeline(&catalog.resolve_pipeline(&pipeline.id).unwrap());
    let stream = StatusReconciliationStream::with_poll_interval(
        Arc::new(cluster.clone()),
        Arc::new(catalog.clone()),
        Duration::from_millis(20),
    );

    let mut sub = stream.subscribe([pipeline.id.clone()]).await;
    let snapshot = sub.next().await.unwrap();
    assert_eq!(snapshot.kind, StatusEventKind::Snapshot);

    cluster.set_state(&names.capture, ConnectorState::Running, vec![ConnectorState::Running]);
    let delta = tokio::time::timeout(Duration::from_secs(5), sub.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delta.kind, StatusEventKind::Delta);
    assert_eq!(delta.pipelines[0].connectors[0].summary, SummaryStatus::Running);

    stream.unsubscribe(sub.id);
}
