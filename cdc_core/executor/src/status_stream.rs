//! One shared poller fanning connector status changes out to subscribers.
//!
//! Every subscriber watches a set of pipeline ids. A tick fetches the status of
//! each watched connector once, and only connectors whose summary changed since
//! the last emission are delivered, grouped per pipeline. A new subscriber
//! gets one unfiltered snapshot of its own pipelines first.

use catalog::Catalog;
use common::config::components::DEFAULT_POLL_INTERVAL_SECS;
use common::naming::{parse_connector_name, ConnectorNames};
use common::types::{ConnectorRole, SummaryStatus};
use parking_lot::Mutex;
use serde::Serialize;
use shared_clients::kafka::{ConnectorCluster, ConnectorStatus};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusEventKind {
    Snapshot,
    Delta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorStatusReport {
    pub connector_name: String,
    pub role: ConnectorRole,
    pub summary: SummaryStatus,
    /// Raw status; `None` when the cluster does not know the connector.
    pub status: Option<ConnectorStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStatusGroup {
    pub pipeline_id: String,
    pub connectors: Vec<ConnectorStatusReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEvent {
    pub kind: StatusEventKind,
    pub pipelines: Vec<PipelineStatusGroup>,
}

impl StatusEvent {
    pub fn pipeline(&self, pipeline_id: &str) -> Option<&PipelineStatusGroup> {
        self.pipelines.iter().find(|g| g.pipeline_id == pipeline_id)
    }

    pub fn connector_count(&self) -> usize {
        self.pipelines.iter().map(|g| g.connectors.len()).sum()
    }
}

pub struct Subscription {
    pub id: u64,
    pub events: UnboundedReceiver<StatusEvent>,
}

impl Subscription {
    pub async fn next(&mut self) -> Option<StatusEvent> {
        self.events.recv().await
    }
}

struct Subscriber {
    pipeline_ids: BTreeSet<String>,
    tx: UnboundedSender<StatusEvent>,
}

#[derive(Default)]
struct State {
    subscribers: BTreeMap<u64, Subscriber>,
    next_id: u64,
    /// Sorted pipeline ids the current `watched` list was derived from.
    watch_key: Option<String>,
    watched: Vec<String>,
    last_sent: HashMap<String, SummaryStatus>,
    poller: Option<JoinHandle<()>>,
}

impl State {
    fn watch_key(&self) -> String {
        let ids: BTreeSet<&str> = self
            .subscribers
            .values()
            .flat_map(|s| s.pipeline_ids.iter().map(String::as_str))
            .collect();
        ids.into_iter().collect::<Vec<_>>().join(",")
    }

    fn clear_caches(&mut self) {
        self.watch_key = None;
        self.watched.clear();
        self.last_sent.clear();
    }
}

struct Inner {
    cluster: Arc<dyn ConnectorCluster>,
    catalog: Arc<dyn Catalog>,
    poll_interval: Duration,
    state: Mutex<State>,
}

/// Clone-able handle; every clone drives the same poller and subscribers.
#[derive(Clone)]
pub struct StatusReconciliationStream {
    inner: Arc<Inner>,
}

impl StatusReconciliationStream {
    pub fn new(cluster: Arc<dyn ConnectorCluster>, catalog: Arc<dyn Catalog>) -> Self {
        Self::with_poll_interval(
            cluster,
            catalog,
            Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        )
    }

    pub fn with_poll_interval(
        cluster: Arc<dyn ConnectorCluster>,
        catalog: Arc<dyn Catalog>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cluster,
                catalog,
                poll_interval,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.state.lock().subscribers.len()
    }

    /// Connector names the next tick will poll.
    pub fn watched_connectors(&self) -> Vec<String> {
        self.inner.state.lock().watched.clone()
    }

    /// Register interest in `pipeline_ids`. The returned subscription has
    /// already received a snapshot of those pipelines' connectors.
    ///
    /// Must be called from within a tokio runtime; the first subscriber starts
    /// the background poller.
    pub async fn subscribe<I, S>(&self, pipeline_ids: I) -> Subscription
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pipeline_ids: BTreeSet<String> = pipeline_ids.into_iter().map(Into::into).collect();
        let (tx, events) = unbounded_channel();
        let id = {
            let mut state = self.inner.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.insert(
                id,
                Subscriber {
                    pipeline_ids: pipeline_ids.clone(),
                    tx: tx.clone(),
                },
            );
            id
        };
        self.refresh_watch();

        let names = self.connector_names(&pipeline_ids);
        let reports = self.fetch(&names).await;
        {
            let mut state = self.inner.state.lock();
            for report in &reports {
                state
                    .last_sent
                    .entry(report.connector_name.clone())
                    .or_insert(report.summary);
            }
        }
        let snapshot = StatusEvent {
            kind: StatusEventKind::Snapshot,
            pipelines: group_by_pipeline(reports),
        };
        if tx.send(snapshot).is_err() {
            debug!(subscriber = id, "subscriber gone before its snapshot");
        }

        self.ensure_poller();
        info!(subscriber = id, pipelines = pipeline_ids.len(), "status subscriber added");
        Subscription { id, events }
    }

    /// Remove a subscriber. Once none are left the poller stops and every
    /// cached status is forgotten.
    pub fn unsubscribe(&self, id: u64) {
        let mut state = self.inner.state.lock();
        if state.subscribers.remove(&id).is_none() {
            return;
        }
        info!(subscriber = id, "status subscriber removed");
        if state.subscribers.is_empty() {
            Self::stop(&mut state);
        }
    }

    fn stop(state: &mut State) {
        state.clear_caches();
        if let Some(poller) = state.poller.take() {
            poller.abort();
        }
        debug!("status poller stopped");
    }

    fn ensure_poller(&self) {
        let mut state = self.inner.state.lock();
        let running = state.poller.as_ref().is_some_and(|p| !p.is_finished());
        if running || state.subscribers.is_empty() {
            return;
        }
        let inner = Arc::downgrade(&self.inner);
        state.poller = Some(tokio::spawn(poll_loop(inner, self.inner.poll_interval)));
    }

    /// Recompute the watched connector names, unless the set of watched
    /// pipelines is unchanged since the last computation.
    fn refresh_watch(&self) {
        let (key, ids) = {
            let state = self.inner.state.lock();
            let key = state.watch_key();
            if state.watch_key.as_deref() == Some(key.as_str()) {
                return;
            }
            let ids: BTreeSet<String> = state
                .subscribers
                .values()
                .flat_map(|s| s.pipeline_ids.iter().cloned())
                .collect();
            (key, ids)
        };
        let watched = self.connector_names(&ids);
        debug!(connectors = watched.len(), "recomputed watched connectors");

        let mut state = self.inner.state.lock();
        state.watch_key = Some(key);
        state.watched = watched;
    }

    fn connector_names(&self, pipeline_ids: &BTreeSet<String>) -> Vec<String> {
        let mut names = Vec::with_capacity(pipeline_ids.len() * 2);
        for id in pipeline_ids {
            match self.inner.catalog.resolve_pipeline(id) {
                Ok(pipeline) => {
                    let pair = ConnectorNames::for_pipeline(&pipeline);
                    names.push(pair.capture);
                    names.push(pair.apply);
                }
                Err(err) => warn!(pipeline_id = %id, "not watching pipeline: {err}"),
            }
        }
        names
    }

    /// Fetch each connector once. Failures are logged and the connector is
    /// left out; the others are still reported.
    async fn fetch(&self, names: &[String]) -> Vec<ConnectorStatusReport> {
        let mut reports = Vec::with_capacity(names.len());
        for name in names {
            let Some(parsed) = parse_connector_name(name) else {
                warn!(connector = %name, "cannot derive a pipeline from connector name");
                continue;
            };
            match self.inner.cluster.connector_status(name).await {
                Ok(status) => reports.push(ConnectorStatusReport {
                    connector_name: name.clone(),
                    role: parsed.role,
                    summary: status
                        .as_ref()
                        .map_or(SummaryStatus::Undefined, ConnectorStatus::summary),
                    status,
                }),
                Err(err) => warn!(connector = %name, "status fetch failed: {err}"),
            }
        }
        reports
    }

    /// Poll once and deliver the changes. Returns how many connectors changed.
    pub async fn tick(&self) -> usize {
        {
            let mut state = self.inner.state.lock();
            state.subscribers.retain(|id, s| {
                let open = !s.tx.is_closed();
                if !open {
                    debug!(subscriber = *id, "dropping closed subscriber");
                }
                open
            });
            if state.subscribers.is_empty() {
                state.clear_caches();
                return 0;
            }
        }
        self.refresh_watch();

        let watched = self.watched_connectors();
        let reports = self.fetch(&watched).await;

        let mut state = self.inner.state.lock();
        let changed: Vec<ConnectorStatusReport> = reports
            .into_iter()
            .filter(|r| state.last_sent.get(&r.connector_name) != Some(&r.summary))
            .collect();
        if changed.is_empty() {
            return 0;
        }
        for report in &changed {
            state
                .last_sent
                .insert(report.connector_name.clone(), report.summary);
        }

        let count = changed.len();
        let groups = group_by_pipeline(changed);
        for subscriber in state.subscribers.values() {
            let pipelines: Vec<PipelineStatusGroup> = groups
                .iter()
                .filter(|g| subscriber.pipeline_ids.contains(&g.pipeline_id))
                .cloned()
                .collect();
            if pipelines.is_empty() {
                continue;
            }
            let _ = subscriber.tx.send(StatusEvent {
                kind: StatusEventKind::Delta,
                pipelines,
            });
        }
        debug!(changed = count, "delivered status delta");
        count
    }
}

async fn poll_loop(inner: Weak<Inner>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately and the snapshot already covered it
    interval.tick().await;
    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let stream = StatusReconciliationStream { inner };
        stream.tick().await;
        if stream.subscriber_count() == 0 {
            break;
        }
    }
}

fn group_by_pipeline(reports: Vec<ConnectorStatusReport>) -> Vec<PipelineStatusGroup> {
    let mut groups: BTreeMap<String, Vec<ConnectorStatusReport>> = BTreeMap::new();
    for report in reports {
        if let Some(parsed) = parse_connector_name(&report.connector_name) {
            groups.entry(parsed.pipeline_id).or_default().push(report);
        }
    }
    groups
        .into_iter()
        .map(|(pipeline_id, connectors)| PipelineStatusGroup {
            pipeline_id,
            connectors,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_clients::kafka::ConnectorState;

    fn report(name: &str, summary: SummaryStatus) -> ConnectorStatusReport {
        ConnectorStatusReport {
            connector_name: name.to_string(),
            role: parse_connector_name(name).map_or(ConnectorRole::Capture, |p| p.role),
            summary,
            status: Some(ConnectorStatus::new(name, ConnectorState::Running, vec![])),
        }
    }

    #[test]
    fn reports_are_grouped_by_pipeline() {
        let groups = group_by_pipeline(vec![
            report("source.h.db.dbo.p2", SummaryStatus::Running),
            report("source.h.db.dbo.p1", SummaryStatus::Running),
            report("sink.t.db.public.p1", SummaryStatus::Paused),
            report("not-ours", SummaryStatus::Failed),
        ]);
        let ids: Vec<_> = groups.iter().map(|g| g.pipeline_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(groups[0].connectors.len(), 2);
        assert_eq!(groups[0].connectors[1].role, ConnectorRole::Apply);
    }

    #[test]
    fn event_serializes_with_lowercase_kind() {
        let event = StatusEvent {
            kind: StatusEventKind::Delta,
            pipelines: group_by_pipeline(vec![report("source.h.db.dbo.p1", SummaryStatus::Running)]),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "delta");
        assert_eq!(value["pipelines"][0]["connectors"][0]["summary"], "running");
        assert_eq!(value["pipelines"][0]["connectors"][0]["role"], "source");
    }
}
