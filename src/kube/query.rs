//! Cluster query capability
//!
//! `ClusterQuery` is the read-only boundary between the bug-report engine
//! and the cluster API. The engine only ever lists and fetches; it never
//! mutates cluster state. Keeping it behind a trait lets tests drive the
//! resolver and collector without a live cluster.

use crate::constants::{DEFAULT_LOG_TAIL_LINES, MONITORED_NAMESPACE_LABEL};
use crate::models::ResourceRef;
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Event, Namespace, Pod};
use kube::api::{ListParams, LogParams};
use kube::{Api, Client, ResourceExt};
use std::fmt::Write as _;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    /// Names of every namespace labeled as monitored by the mesh
    async fn list_monitored_namespaces(&self) -> Result<Vec<String>>;

    /// Names of all pods in a namespace
    async fn list_pods(&self, namespace: &str) -> Result<Vec<String>>;

    /// Pod manifest rendered as YAML
    async fn fetch_manifest(&self, target: &ResourceRef) -> Result<Vec<u8>>;

    /// Trailing container logs
    async fn fetch_logs(&self, target: &ResourceRef) -> Result<Vec<u8>>;

    /// Recent events involving the resource, one line per event
    async fn fetch_events(&self, target: &ResourceRef) -> Result<Vec<u8>>;

    /// Namespace manifest rendered as YAML
    async fn fetch_namespace_manifest(&self, namespace: &str) -> Result<Vec<u8>>;

    /// All recent events in the namespace, one line per event
    async fn fetch_namespace_events(&self, namespace: &str) -> Result<Vec<u8>>;
}

/// `ClusterQuery` backed by a live `kube::Client`
pub struct KubeClusterQuery {
    client: Client,
}

impl KubeClusterQuery {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn events(&self, namespace: &str) -> Api<Event> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterQuery for KubeClusterQuery {
    async fn list_monitored_namespaces(&self) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let params = ListParams::default().labels(MONITORED_NAMESPACE_LABEL);
        let namespaces = api
            .list(&params)
            .await
            .context("Failed to list monitored namespaces")?;
        Ok(namespaces.iter().map(|ns| ns.name_any()).collect())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<String>> {
        let pods = self
            .pods(namespace)
            .list(&ListParams::default())
            .await
            .with_context(|| format!("Failed to list pods in namespace {}", namespace))?;
        Ok(pods.iter().map(|pod| pod.name_any()).collect())
    }

    async fn fetch_manifest(&self, target: &ResourceRef) -> Result<Vec<u8>> {
        let pod = self
            .pods(&target.namespace)
            .get(&target.name)
            .await
            .with_context(|| format!("Failed to fetch manifest for {}", target))?;
        let yaml = serde_yaml::to_string(&pod)
            .with_context(|| format!("Failed to render manifest for {}", target))?;
        Ok(yaml.into_bytes())
    }

    async fn fetch_logs(&self, target: &ResourceRef) -> Result<Vec<u8>> {
        let params = LogParams {
            tail_lines: Some(DEFAULT_LOG_TAIL_LINES),
            timestamps: true,
            ..LogParams::default()
        };
        let logs = self
            .pods(&target.namespace)
            .logs(&target.name, &params)
            .await
            .with_context(|| format!("Failed to fetch logs for {}", target))?;
        Ok(logs.into_bytes())
    }

    async fn fetch_events(&self, target: &ResourceRef) -> Result<Vec<u8>> {
        let params = ListParams::default().fields(&format!(
            "involvedObject.name={},involvedObject.namespace={}",
            target.name, target.namespace
        ));
        let events = self
            .events(&target.namespace)
            .list(&params)
            .await
            .with_context(|| format!("Failed to fetch events for {}", target))?;
        Ok(format_events(events.iter()).into_bytes())
    }

    async fn fetch_namespace_manifest(&self, namespace: &str) -> Result<Vec<u8>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let ns = api
            .get(namespace)
            .await
            .with_context(|| format!("Failed to fetch namespace {}", namespace))?;
        let yaml = serde_yaml::to_string(&ns)
            .with_context(|| format!("Failed to render namespace {}", namespace))?;
        Ok(yaml.into_bytes())
    }

    async fn fetch_namespace_events(&self, namespace: &str) -> Result<Vec<u8>> {
        let events = self
            .events(namespace)
            .list(&ListParams::default())
            .await
            .with_context(|| format!("Failed to fetch events in namespace {}", namespace))?;
        Ok(format_events(events.iter()).into_bytes())
    }
}

/// Render events as one tab-separated line each:
/// timestamp, type, reason, involved object, message.
fn format_events<'a>(events: impl Iterator<Item = &'a Event>) -> String {
    let mut out = String::new();
    for event in events {
        let timestamp = event
            .last_timestamp
            .as_ref()
            .map(|t| t.0.to_rfc3339())
            .unwrap_or_else(|| "<unknown>".to_string());
        let involved = event
            .involved_object
            .name
            .as_deref()
            .unwrap_or("-");
        // writeln! into a String cannot fail
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            timestamp,
            event.type_.as_deref().unwrap_or("-"),
            event.reason.as_deref().unwrap_or("-"),
            involved,
            event.message.as_deref().unwrap_or("-"),
        );
    }
    out
}
