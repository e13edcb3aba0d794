//! Target resolution
//!
//! Expands a `TargetSpec` into the canonical list of concrete resources to
//! collect from. Explicit mode is pure parsing; wildcard mode consults the
//! cluster. Either way the result is deduplicated, deterministically
//! ordered, and carries its warnings instead of aborting on them: a
//! malformed identifier or one failed namespace listing must never sink
//! the rest of the run.

use crate::kube::ClusterQuery;
use crate::models::{ResourceRef, TargetSpec};
use std::collections::HashSet;

/// Resolved collection inputs: pass-through namespaces, the final target
/// set, and any warnings accumulated along the way.
#[derive(Debug, Default)]
pub struct Resolution {
    pub namespaces: Vec<String>,
    pub targets: Vec<ResourceRef>,
    pub warnings: Vec<String>,
}

/// Expand `spec` into concrete targets.
///
/// The cluster is only consulted in `All` mode. Given the same cluster
/// state and the same explicit inputs, the result is identical across
/// runs: explicit targets keep first-insertion order, wildcard targets
/// come out namespace-major, pod-minor.
pub async fn resolve(spec: &TargetSpec, query: &dyn ClusterQuery) -> Resolution {
    match spec {
        TargetSpec::Explicit {
            namespaces,
            deployments,
            pods,
        } => resolve_explicit(namespaces, deployments, pods),
        TargetSpec::All => resolve_all(query).await,
    }
}

fn resolve_explicit(namespaces: &[String], deployments: &[String], pods: &[String]) -> Resolution {
    let mut resolution = Resolution::default();
    let mut seen_targets = HashSet::new();
    let mut seen_namespaces = HashSet::new();

    // Namespaces pass through without API validation
    for namespace in namespaces {
        if seen_namespaces.insert(namespace.clone()) {
            resolution.namespaces.push(namespace.clone());
        }
    }

    for pod in pods {
        match ResourceRef::parse(pod) {
            Ok(parsed) => {
                if seen_targets.insert(parsed.clone()) {
                    resolution.targets.push(parsed);
                }
            }
            Err(_) => {
                tracing::warn!("Skipping malformed pod identifier: {}", pod);
                resolution
                    .warnings
                    .push(format!("pod name {} is not namespaced, skipping it", pod));
            }
        }
    }

    for deployment in deployments {
        match ResourceRef::parse(deployment) {
            Ok(parsed) => {
                if seen_targets.insert(parsed.clone()) {
                    resolution.targets.push(parsed);
                }
            }
            Err(_) => {
                tracing::warn!("Skipping malformed deployment identifier: {}", deployment);
                resolution.warnings.push(format!(
                    "deployment name {} is not namespaced, skipping it",
                    deployment
                ));
            }
        }
    }

    resolution
}

async fn resolve_all(query: &dyn ClusterQuery) -> Resolution {
    let mut resolution = Resolution::default();

    let mut namespaces = match query.list_monitored_namespaces().await {
        Ok(namespaces) => namespaces,
        Err(e) => {
            tracing::warn!("Unable to list monitored namespaces: {:#}", e);
            resolution
                .warnings
                .push(format!("unable to list monitored namespaces: {}", e));
            return resolution;
        }
    };
    namespaces.sort();
    namespaces.dedup();

    let mut seen_targets = HashSet::new();
    for namespace in namespaces {
        match query.list_pods(&namespace).await {
            Ok(mut pods) => {
                pods.sort();
                for pod in pods {
                    let target = ResourceRef::new(namespace.clone(), pod);
                    if seen_targets.insert(target.clone()) {
                        resolution.targets.push(target);
                    }
                }
            }
            Err(e) => {
                // This namespace contributes zero pods; the rest continue
                tracing::warn!("Unable to list pods in namespace {}: {:#}", namespace, e);
                resolution.warnings.push(format!(
                    "unable to get pods from namespace {}: {}",
                    namespace, e
                ));
            }
        }
        resolution.namespaces.push(namespace);
    }

    resolution
}
