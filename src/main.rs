//! meshdump - diagnostic bundle generator for service-mesh control planes
//!
//! Collects manifests, logs, and events for the requested targets and the
//! control plane itself, then packs everything into a single archive for
//! offline inspection or sharing with support engineers.

use anyhow::{Context, Result};
use clap::Parser;
use meshdump::bugreport::BugReport;
use meshdump::cli::init_logging;
use meshdump::constants;
use meshdump::kube::{KubeClusterQuery, create_client, current_context};
use meshdump::models::TargetSpec;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const LONG_ABOUT: &str = "\
Generate a diagnostic bundle for a service-mesh control plane.

If '--out-file' or '-o' is not specified, the bundle is written as a
compressed tar file in the tar.gz format. To use a different archive
format, specify the output file along with its extension.

The format of the archive is determined by its file extension.
Supported extensions:
  .zip
  .tar
  .tar.gz
  .tgz
  .tar.bz2
  .tbz2
  .tar.xz
  .txz
  .tar.zst
  .tzst

Note: if the environment includes sensitive information that should not
be collected, do not specify the associated resources. Before sharing a
bundle, audit and redact anything that should not be shared.";

/// Generate a diagnostic bundle for a service-mesh control plane
#[derive(Parser, Debug)]
#[command(name = "meshdump")]
#[command(about = "Generate a diagnostic bundle for a service-mesh control plane")]
#[command(long_about = LONG_ABOUT)]
struct Args {
    /// Collect from all pods in every monitored namespace
    #[arg(long)]
    all: bool,

    /// Application namespaces to include
    #[arg(long = "app-namespaces", value_delimiter = ',')]
    app_namespaces: Vec<String>,

    /// Application deployments: <namespace>/<deployment>
    #[arg(long = "app-deployments", value_delimiter = ',')]
    app_deployments: Vec<String>,

    /// Application pods: <namespace>/<pod>
    #[arg(long = "app-pods", value_delimiter = ',')]
    app_pods: Vec<String>,

    /// Output file with archive format extension
    #[arg(long = "out-file", short = 'o')]
    out_file: Option<PathBuf>,

    /// Namespace hosting the mesh control plane
    #[arg(long = "mesh-namespace", default_value = constants::DEFAULT_MESH_NAMESPACE)]
    mesh_namespace: String,

    /// Whole-run deadline in seconds (0 disables it)
    #[arg(long, default_value_t = 0)]
    timeout: u64,

    /// Maximum concurrent collection requests against the cluster API
    #[arg(long = "max-concurrent", default_value_t = constants::DEFAULT_MAX_CONCURRENT)]
    max_concurrent: usize,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    tracing::debug!("Initializing Kubernetes client");
    let client = create_client()
        .await
        .context("Could not access Kubernetes cluster, check kubeconfig")?;
    tracing::debug!("Connected to Kubernetes cluster: {}", current_context());

    let spec = TargetSpec::from_flags(
        args.all,
        args.app_namespaces,
        args.app_deployments,
        args.app_pods,
    );
    let query = Arc::new(KubeClusterQuery::new(client));

    let mut report = BugReport::new(query, spec, args.mesh_namespace);
    report.out_file = args.out_file;
    report.max_concurrent = args.max_concurrent;
    report.deadline = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));

    let outcome = report.run().await?;
    if outcome.resolved_targets == 0 {
        // the control-plane-only bundle was still written above
        std::process::exit(1);
    }
    Ok(())
}
