//! Wildcard (`--all`) collection behavior

mod common;

use common::{FakeCluster, SharedBuf, tar_gz_entries};
use meshdump::bugreport::BugReport;
use meshdump::models::{ResourceRef, TargetSpec};
use meshdump::resolver::resolve;
use std::sync::Arc;

fn monitored_cluster() -> FakeCluster {
    let mut cluster = FakeCluster::with_control_plane("mesh-system", &["mesh-controller-1"]);
    cluster.monitored = vec!["bookstore".to_string(), "bookbuyer".to_string()];
    cluster
        .pods
        .insert("bookbuyer".to_string(), vec!["buyer-1".to_string()]);
    cluster.pods.insert(
        "bookstore".to_string(),
        vec!["store-2".to_string(), "store-1".to_string()],
    );
    cluster
}

#[tokio::test]
async fn test_all_mode_discovers_monitored_pods_in_order() {
    let cluster = monitored_cluster();
    let resolution = resolve(&TargetSpec::All, &cluster).await;

    assert_eq!(
        resolution.targets,
        vec![
            ResourceRef::new("bookbuyer", "buyer-1"),
            ResourceRef::new("bookstore", "store-1"),
            ResourceRef::new("bookstore", "store-2"),
        ]
    );
    assert!(resolution.warnings.is_empty());
}

#[tokio::test]
async fn test_all_mode_bundle_covers_discovered_namespaces_and_pods() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("all.tar.gz");

    let stdout = SharedBuf::default();
    let mut report = BugReport::new(
        Arc::new(monitored_cluster()),
        TargetSpec::All,
        "mesh-system".to_string(),
    );
    report.out_file = Some(out.clone());
    report.stdout = Box::new(stdout.clone());
    report.stderr = Box::new(SharedBuf::default());
    let outcome = report.run().await.unwrap();

    assert_eq!(outcome.resolved_targets, 3);
    let entries = tar_gz_entries(&out);
    for expected in [
        "control-plane/mesh-system/pods/mesh-controller-1/manifest.yaml",
        "namespaces/bookbuyer/namespace.yaml",
        "namespaces/bookstore/namespace.yaml",
        "targets/bookbuyer/buyer-1/logs.txt",
        "targets/bookstore/store-1/logs.txt",
        "targets/bookstore/store-2/logs.txt",
    ] {
        assert!(
            entries.iter().any(|e| e == expected),
            "missing entry {} in {:?}",
            expected,
            entries
        );
    }
}

#[tokio::test]
async fn test_all_mode_listing_failure_is_advisory() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("advisory.tar.gz");

    let mut cluster = monitored_cluster();
    cluster.fail_listing_for.insert("bookstore".to_string());

    let stderr = SharedBuf::default();
    let mut report = BugReport::new(
        Arc::new(cluster),
        TargetSpec::All,
        "mesh-system".to_string(),
    );
    report.out_file = Some(out.clone());
    report.stdout = Box::new(SharedBuf::default());
    report.stderr = Box::new(stderr.clone());
    let outcome = report.run().await.unwrap();

    // bookbuyer still contributed its pod
    assert_eq!(outcome.resolved_targets, 1);
    let entries = tar_gz_entries(&out);
    assert!(entries.iter().any(|e| e == "targets/bookbuyer/buyer-1/logs.txt"));
    // the failed namespace still gets namespace-level artifacts
    assert!(entries.iter().any(|e| e == "namespaces/bookstore/namespace.yaml"));
    assert!(stderr.contents().contains("bookstore"));
}

#[tokio::test]
async fn test_all_mode_zero_monitored_namespaces_archives_control_plane_only() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("none.tar.gz");

    let cluster = FakeCluster::with_control_plane("mesh-system", &["mesh-controller-1"]);
    let mut report = BugReport::new(
        Arc::new(cluster),
        TargetSpec::All,
        "mesh-system".to_string(),
    );
    report.out_file = Some(out.clone());
    report.stdout = Box::new(SharedBuf::default());
    report.stderr = Box::new(SharedBuf::default());
    let outcome = report.run().await.unwrap();

    assert_eq!(outcome.resolved_targets, 0);
    let entries = tar_gz_entries(&out);
    assert!(
        entries
            .iter()
            .all(|e| e.starts_with("control-plane/") || e.starts_with("collection-report.")),
        "{:?}",
        entries
    );
}
