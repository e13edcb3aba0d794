//! Kubernetes client module
//!
//! Handles connection to the Kubernetes API server and exposes the
//! cluster-query capability the engine consumes.

mod query;

pub use query::{ClusterQuery, KubeClusterQuery};

#[cfg(test)]
pub use query::MockClusterQuery;

use anyhow::Result;
use kube::config::Kubeconfig;
use kube::{Client, Config};

/// Initialize and return a Kubernetes client
///
/// `Config::infer` tries in-cluster config first, then `KUBECONFIG`,
/// then `~/.kube/config`.
pub async fn create_client() -> Result<Client> {
    let config = Config::infer().await?;
    let client = Client::try_from(config)?;
    Ok(client)
}

/// Name of the active kubeconfig context, for connection diagnostics.
/// In-cluster runs have no kubeconfig and report a placeholder.
pub fn current_context() -> String {
    Kubeconfig::read()
        .ok()
        .and_then(|kubeconfig| kubeconfig.current_context)
        .unwrap_or_else(|| "in-cluster".to_string())
}
