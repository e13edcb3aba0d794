//! Shared constants

/// Label selector identifying namespaces monitored by the mesh.
/// Namespaces carrying this label are discovered in `--all` mode.
pub const MONITORED_NAMESPACE_LABEL: &str = "openmesh.io/monitored-by";

/// Default control-plane namespace
pub const DEFAULT_MESH_NAMESPACE: &str = "mesh-system";

/// Default bound on concurrent per-subject collection work
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Capacity of the artifact channel between collection workers and the
/// single archive writer
pub const ARTIFACT_CHANNEL_CAPACITY: usize = 32;

/// How many trailing log lines to collect per pod
pub const DEFAULT_LOG_TAIL_LINES: i64 = 10_000;

/// Default output file when `--out-file` is not given
pub const DEFAULT_OUT_FILE: &str = "meshdump-bugreport";
