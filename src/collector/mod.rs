//! Artifact collection
//!
//! Gathers the diagnostic bundle for every resolved subject: the
//! control-plane namespace first, then pass-through app namespaces, then
//! targets. Subjects are collected on a bounded worker pool but their
//! artifacts are emitted in subject-major, kind-minor order through a
//! single bounded channel, so archive contents are reproducible across
//! identical inputs.
//!
//! Failure isolation is per artifact kind: one failed fetch records a
//! reason against its subject and emits an empty blob marked partial;
//! sibling kinds and sibling subjects are unaffected. An expired run
//! deadline stops further API calls and reports untouched subjects as
//! cancelled.

use crate::constants::ARTIFACT_CHANNEL_CAPACITY;
use crate::kube::ClusterQuery;
use crate::models::{
    ArtifactBlob, CollectionReport, CollectionStatus, ReportEntry, ReportSubject, ResourceRef,
};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Collects diagnostic artifacts through a `ClusterQuery` capability
pub struct Collector {
    query: Arc<dyn ClusterQuery>,
    max_concurrent: usize,
    deadline: Option<Duration>,
}

impl Collector {
    pub fn new(query: Arc<dyn ClusterQuery>) -> Self {
        Self {
            query,
            max_concurrent: crate::constants::DEFAULT_MAX_CONCURRENT,
            deadline: None,
        }
    }

    /// Bound on concurrently collected subjects
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Whole-run deadline; expiry cancels not-yet-collected subjects
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Start collection. Artifacts stream out of the returned receiver as
    /// they are produced (the full bundle is never materialized in
    /// memory); the report resolves once every subject is accounted for.
    ///
    /// Dropping the receiver stops collection early; the report then
    /// covers only the subjects finished up to that point.
    pub fn collect(
        &self,
        control_plane_namespace: String,
        namespaces: Vec<String>,
        targets: Vec<ResourceRef>,
    ) -> (mpsc::Receiver<ArtifactBlob>, JoinHandle<CollectionReport>) {
        let (tx, rx) = mpsc::channel(ARTIFACT_CHANNEL_CAPACITY);
        let query = self.query.clone();
        let max_concurrent = self.max_concurrent;
        let deadline = self.deadline.map(|d| Instant::now() + d);

        let handle = tokio::spawn(async move {
            let mut units = Vec::with_capacity(1 + namespaces.len() + targets.len());
            units.push(Unit::ControlPlane(control_plane_namespace.clone()));
            for namespace in namespaces {
                // the control plane already gets the richer bundle
                if namespace != control_plane_namespace {
                    units.push(Unit::Namespace(namespace));
                }
            }
            for target in targets {
                units.push(Unit::Target(target));
            }

            let mut report = CollectionReport::default();
            let mut results = stream::iter(units.into_iter().map(|unit| {
                let query = query.clone();
                async move { collect_unit(query.as_ref(), unit, deadline).await }
            }))
            .buffered(max_concurrent);

            while let Some((blobs, entry)) = results.next().await {
                report.push(entry);
                for blob in blobs {
                    if tx.send(blob).await.is_err() {
                        tracing::debug!("Artifact sink closed, stopping collection");
                        return report;
                    }
                }
            }
            report
        });

        (rx, handle)
    }
}

/// One schedulable piece of collection work
enum Unit {
    ControlPlane(String),
    Namespace(String),
    Target(ResourceRef),
}

impl Unit {
    fn subject(&self) -> ReportSubject {
        match self {
            Unit::ControlPlane(ns) => ReportSubject::ControlPlane(ns.clone()),
            Unit::Namespace(ns) => ReportSubject::Namespace(ns.clone()),
            Unit::Target(target) => ReportSubject::Target(target.clone()),
        }
    }
}

enum FetchError {
    Deadline,
    Query(String),
}

/// Run one fetch against the remaining deadline budget
async fn run_fetch<T, F>(deadline: Option<Instant>, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match deadline {
        Some(at) => {
            if Instant::now() >= at {
                return Err(FetchError::Deadline);
            }
            match tokio::time::timeout_at(at, fut).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(FetchError::Query(format!("{:#}", e))),
                Err(_) => Err(FetchError::Deadline),
            }
        }
        None => fut.await.map_err(|e| FetchError::Query(format!("{:#}", e))),
    }
}

/// Tracks per-kind outcomes for one subject
#[derive(Default)]
struct KindTally {
    attempted: usize,
    succeeded: usize,
    deadline_hits: usize,
}

impl KindTally {
    fn status(&self) -> CollectionStatus {
        if self.attempted == 0 || self.succeeded == self.attempted {
            CollectionStatus::Succeeded
        } else if self.succeeded > 0 {
            CollectionStatus::Partial
        } else if self.deadline_hits == self.attempted {
            CollectionStatus::Cancelled
        } else {
            CollectionStatus::Failed
        }
    }
}

/// Record one fetch outcome: a complete blob on success, an empty blob
/// marked partial plus a failure reason otherwise.
fn push_artifact(
    blobs: &mut Vec<ArtifactBlob>,
    failures: &mut Vec<String>,
    tally: &mut KindTally,
    path: String,
    source: Option<ResourceRef>,
    kind: &str,
    outcome: Result<Vec<u8>, FetchError>,
) {
    tally.attempted += 1;
    match outcome {
        Ok(data) => {
            tally.succeeded += 1;
            blobs.push(ArtifactBlob::new(path, data, source));
        }
        Err(FetchError::Deadline) => {
            tally.deadline_hits += 1;
            failures.push(format!("{}: run deadline exceeded", kind));
            blobs.push(ArtifactBlob::partial(path, source));
        }
        Err(FetchError::Query(reason)) => {
            failures.push(format!("{}: {}", kind, reason));
            blobs.push(ArtifactBlob::partial(path, source));
        }
    }
}

async fn collect_unit(
    query: &dyn ClusterQuery,
    unit: Unit,
    deadline: Option<Instant>,
) -> (Vec<ArtifactBlob>, ReportEntry) {
    if let Some(at) = deadline {
        if Instant::now() >= at {
            return (
                Vec::new(),
                ReportEntry {
                    subject: unit.subject(),
                    status: CollectionStatus::Cancelled,
                    failures: vec!["run deadline exceeded before collection started".to_string()],
                },
            );
        }
    }

    match unit {
        Unit::ControlPlane(namespace) => collect_control_plane(query, namespace, deadline).await,
        Unit::Namespace(namespace) => collect_namespace(query, namespace, deadline).await,
        Unit::Target(target) => collect_target(query, target, deadline).await,
    }
}

async fn collect_target(
    query: &dyn ClusterQuery,
    target: ResourceRef,
    deadline: Option<Instant>,
) -> (Vec<ArtifactBlob>, ReportEntry) {
    let base = format!("targets/{}/{}", target.namespace, target.name);
    let (manifest, logs, events) = tokio::join!(
        run_fetch(deadline, query.fetch_manifest(&target)),
        run_fetch(deadline, query.fetch_logs(&target)),
        run_fetch(deadline, query.fetch_events(&target)),
    );

    let mut blobs = Vec::new();
    let mut failures = Vec::new();
    let mut tally = KindTally::default();
    push_artifact(
        &mut blobs,
        &mut failures,
        &mut tally,
        format!("{}/manifest.yaml", base),
        Some(target.clone()),
        "manifest",
        manifest,
    );
    push_artifact(
        &mut blobs,
        &mut failures,
        &mut tally,
        format!("{}/logs.txt", base),
        Some(target.clone()),
        "logs",
        logs,
    );
    push_artifact(
        &mut blobs,
        &mut failures,
        &mut tally,
        format!("{}/events.txt", base),
        Some(target.clone()),
        "events",
        events,
    );

    let entry = ReportEntry {
        subject: ReportSubject::Target(target),
        status: tally.status(),
        failures,
    };
    (blobs, entry)
}

async fn collect_namespace(
    query: &dyn ClusterQuery,
    namespace: String,
    deadline: Option<Instant>,
) -> (Vec<ArtifactBlob>, ReportEntry) {
    let base = format!("namespaces/{}", namespace);
    let (manifest, events) = tokio::join!(
        run_fetch(deadline, query.fetch_namespace_manifest(&namespace)),
        run_fetch(deadline, query.fetch_namespace_events(&namespace)),
    );

    let mut blobs = Vec::new();
    let mut failures = Vec::new();
    let mut tally = KindTally::default();
    push_artifact(
        &mut blobs,
        &mut failures,
        &mut tally,
        format!("{}/namespace.yaml", base),
        None,
        "namespace manifest",
        manifest,
    );
    push_artifact(
        &mut blobs,
        &mut failures,
        &mut tally,
        format!("{}/events.txt", base),
        None,
        "namespace events",
        events,
    );

    let entry = ReportEntry {
        subject: ReportSubject::Namespace(namespace),
        status: tally.status(),
        failures,
    };
    (blobs, entry)
}

/// The control-plane bundle: namespace manifest and events, plus the full
/// pod bundle for every pod currently in the namespace.
async fn collect_control_plane(
    query: &dyn ClusterQuery,
    namespace: String,
    deadline: Option<Instant>,
) -> (Vec<ArtifactBlob>, ReportEntry) {
    let base = format!("control-plane/{}", namespace);
    let (manifest, events) = tokio::join!(
        run_fetch(deadline, query.fetch_namespace_manifest(&namespace)),
        run_fetch(deadline, query.fetch_namespace_events(&namespace)),
    );

    let mut blobs = Vec::new();
    let mut failures = Vec::new();
    let mut tally = KindTally::default();
    push_artifact(
        &mut blobs,
        &mut failures,
        &mut tally,
        format!("{}/namespace.yaml", base),
        None,
        "namespace manifest",
        manifest,
    );
    push_artifact(
        &mut blobs,
        &mut failures,
        &mut tally,
        format!("{}/events.txt", base),
        None,
        "namespace events",
        events,
    );

    match run_fetch(deadline, query.list_pods(&namespace)).await {
        Ok(mut pods) => {
            tally.attempted += 1;
            tally.succeeded += 1;
            pods.sort();
            for pod in pods {
                let target = ResourceRef::new(namespace.clone(), pod);
                let pod_base = format!("{}/pods/{}", base, target.name);
                let (manifest, logs, events) = tokio::join!(
                    run_fetch(deadline, query.fetch_manifest(&target)),
                    run_fetch(deadline, query.fetch_logs(&target)),
                    run_fetch(deadline, query.fetch_events(&target)),
                );
                let mut pod_failures = Vec::new();
                push_artifact(
                    &mut blobs,
                    &mut pod_failures,
                    &mut tally,
                    format!("{}/manifest.yaml", pod_base),
                    Some(target.clone()),
                    "manifest",
                    manifest,
                );
                push_artifact(
                    &mut blobs,
                    &mut pod_failures,
                    &mut tally,
                    format!("{}/logs.txt", pod_base),
                    Some(target.clone()),
                    "logs",
                    logs,
                );
                push_artifact(
                    &mut blobs,
                    &mut pod_failures,
                    &mut tally,
                    format!("{}/events.txt", pod_base),
                    Some(target.clone()),
                    "events",
                    events,
                );
                failures.extend(
                    pod_failures
                        .into_iter()
                        .map(|f| format!("pod {}: {}", target.name, f)),
                );
            }
        }
        Err(FetchError::Deadline) => {
            tally.attempted += 1;
            tally.deadline_hits += 1;
            failures.push("list pods: run deadline exceeded".to_string());
        }
        Err(FetchError::Query(reason)) => {
            tally.attempted += 1;
            failures.push(format!("list pods: {}", reason));
        }
    }

    let entry = ReportEntry {
        subject: ReportSubject::ControlPlane(namespace),
        status: tally.status(),
        failures,
    };
    (blobs, entry)
}
