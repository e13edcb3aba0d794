//! Shared test fixtures: an in-memory cluster and capturable output sinks
//!
//! Not every test binary uses every helper here.
#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use meshdump::kube::ClusterQuery;
use meshdump::models::ResourceRef;
use std::collections::{BTreeMap, HashSet};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// In-memory `ClusterQuery` with scriptable failures
#[derive(Default, Clone)]
pub struct FakeCluster {
    /// Namespaces carrying the monitored label
    pub monitored: Vec<String>,
    /// namespace -> pod names
    pub pods: BTreeMap<String, Vec<String>>,
    /// Pod names whose log fetch fails
    pub fail_logs_for: HashSet<String>,
    /// Namespaces whose pod listing fails
    pub fail_listing_for: HashSet<String>,
}

impl FakeCluster {
    pub fn with_control_plane(namespace: &str, pods: &[&str]) -> Self {
        let mut cluster = Self::default();
        cluster.pods.insert(
            namespace.to_string(),
            pods.iter().map(|p| p.to_string()).collect(),
        );
        cluster
    }
}

#[async_trait]
impl ClusterQuery for FakeCluster {
    async fn list_monitored_namespaces(&self) -> Result<Vec<String>> {
        Ok(self.monitored.clone())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<String>> {
        if self.fail_listing_for.contains(namespace) {
            return Err(anyhow!("pods is forbidden"));
        }
        Ok(self.pods.get(namespace).cloned().unwrap_or_default())
    }

    async fn fetch_manifest(&self, target: &ResourceRef) -> Result<Vec<u8>> {
        Ok(format!(
            "apiVersion: v1\nkind: Pod\nmetadata:\n  namespace: {}\n  name: {}\n",
            target.namespace, target.name
        )
        .into_bytes())
    }

    async fn fetch_logs(&self, target: &ResourceRef) -> Result<Vec<u8>> {
        if self.fail_logs_for.contains(&target.name) {
            return Err(anyhow!("container log stream unavailable"));
        }
        Ok(format!("log output for {}\n", target).into_bytes())
    }

    async fn fetch_events(&self, target: &ResourceRef) -> Result<Vec<u8>> {
        Ok(format!("Normal\tScheduled\t{}\n", target.name).into_bytes())
    }

    async fn fetch_namespace_manifest(&self, namespace: &str) -> Result<Vec<u8>> {
        Ok(format!(
            "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: {}\n",
            namespace
        )
        .into_bytes())
    }

    async fn fetch_namespace_events(&self, namespace: &str) -> Result<Vec<u8>> {
        Ok(format!("Normal\tCreated\tnamespace {}\n", namespace).into_bytes())
    }
}

/// A `Write` sink whose contents can be read back after the run
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// List entry paths of a gzip-compressed tar archive
pub fn tar_gz_entries(path: &std::path::Path) -> Vec<String> {
    let file = std::fs::File::open(path).expect("archive should exist");
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
    archive
        .entries()
        .unwrap()
        .map(|e| {
            e.unwrap()
                .path()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

/// Read one entry of a gzip-compressed tar archive as a string
pub fn tar_gz_entry_content(path: &std::path::Path, entry_path: &str) -> String {
    use std::io::Read;
    let file = std::fs::File::open(path).expect("archive should exist");
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        if entry.path().unwrap().to_string_lossy() == entry_path {
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            return content;
        }
    }
    panic!("entry {} not found in {}", entry_path, path.display());
}
