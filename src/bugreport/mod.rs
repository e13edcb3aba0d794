//! Bug-report orchestration
//!
//! Wires the pipeline end to end: resolve targets, collect artifacts,
//! stream them into the archive, and report the outcome. Recoverable
//! problems surface on the diagnostic stream and in the collection
//! report; only archive failures abort the run.

use crate::archive::{ArchiveDescriptor, ArchiveHandle};
use crate::collector::Collector;
use crate::constants::{DEFAULT_MAX_CONCURRENT, DEFAULT_OUT_FILE};
use crate::kube::ClusterQuery;
use crate::models::{ArtifactBlob, CollectionReport, CollectionStatus, TargetSpec};
use crate::resolver;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Logical path of the human-readable run report appended to every bundle
pub const REPORT_ENTRY_PATH: &str = "collection-report.txt";

/// Logical path of the machine-readable run report
pub const REPORT_JSON_PATH: &str = "collection-report.json";

/// One bug-report run: inputs, capability handle, and output sinks.
pub struct BugReport {
    pub query: Arc<dyn ClusterQuery>,
    pub spec: TargetSpec,
    pub control_plane_namespace: String,
    /// Destination path; the archive format is inferred from its
    /// extension. `None` uses the default name and format.
    pub out_file: Option<PathBuf>,
    pub max_concurrent: usize,
    pub deadline: Option<Duration>,
    /// User-facing summary sink
    pub stdout: Box<dyn Write + Send>,
    /// Warning/diagnostic sink
    pub stderr: Box<dyn Write + Send>,
}

/// What a finished run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub archive_path: PathBuf,
    pub report: CollectionReport,
    /// Number of concrete targets the resolver produced. Zero is a
    /// reportable condition even though the control-plane bundle is
    /// still written.
    pub resolved_targets: usize,
}

impl BugReport {
    pub fn new(
        query: Arc<dyn ClusterQuery>,
        spec: TargetSpec,
        control_plane_namespace: String,
    ) -> Self {
        Self {
            query,
            spec,
            control_plane_namespace,
            out_file: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            deadline: None,
            stdout: Box::new(std::io::stdout()),
            stderr: Box::new(std::io::stderr()),
        }
    }

    /// Run the full pipeline. Returns `Err` only for fatal archive
    /// failures; everything recoverable lands in the outcome's report.
    pub async fn run(mut self) -> Result<RunOutcome> {
        let resolution = resolver::resolve(&self.spec, self.query.as_ref()).await;
        for warning in &resolution.warnings {
            let _ = writeln!(self.stderr, "warning: {}", warning);
        }
        if resolution.targets.is_empty() {
            let _ = writeln!(
                self.stderr,
                "warning: no targets resolved, collecting control-plane data only"
            );
        }

        let out_file = self
            .out_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_FILE));
        let descriptor = ArchiveDescriptor::from_path(out_file);
        let mut archive = ArchiveHandle::create(&descriptor)
            .with_context(|| format!("Failed to create archive {}", descriptor.path.display()))?;

        let resolved_targets = resolution.targets.len();
        let collector = Collector::new(self.query.clone())
            .with_max_concurrent(self.max_concurrent)
            .with_deadline(self.deadline);
        let (mut artifacts, report_handle) = collector.collect(
            self.control_plane_namespace.clone(),
            resolution.namespaces,
            resolution.targets,
        );

        while let Some(blob) = artifacts.recv().await {
            tracing::debug!("Archiving {} ({} bytes)", blob.path, blob.data.len());
            archive
                .write(&blob)
                .with_context(|| format!("Failed to write archive entry {}", blob.path))?;
        }

        let report = report_handle
            .await
            .context("Artifact collection task failed")?;

        for entry in &report.entries {
            for failure in &entry.failures {
                let _ = writeln!(self.stderr, "warning: {}: {}", entry.subject, failure);
            }
        }

        // The bundle carries its own outcome record so it can be read
        // offline without the console output.
        let report_blob =
            ArtifactBlob::new(REPORT_ENTRY_PATH, report.render().into_bytes(), None);
        archive
            .write(&report_blob)
            .context("Failed to write collection report entry")?;
        let report_json = serde_json::to_vec_pretty(&report)
            .context("Failed to encode collection report as JSON")?;
        archive
            .write(&ArtifactBlob::new(REPORT_JSON_PATH, report_json, None))
            .context("Failed to write collection report entry")?;
        archive.close().context("Failed to finalize archive")?;

        let succeeded = report.count(CollectionStatus::Succeeded);
        let partial = report.count(CollectionStatus::Partial);
        let failed = report.count(CollectionStatus::Failed);
        let cancelled = report.count(CollectionStatus::Cancelled);
        let _ = writeln!(
            self.stdout,
            "Collected {} of {} subjects ({} partial, {} failed, {} cancelled)",
            succeeded,
            report.entries.len(),
            partial,
            failed,
            cancelled
        );
        let _ = writeln!(
            self.stdout,
            "Bug report written to {}",
            descriptor.path.display()
        );

        Ok(RunOutcome {
            archive_path: descriptor.path,
            report,
            resolved_targets,
        })
    }
}
