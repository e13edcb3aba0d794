//! meshdump library
//!
//! Core functionality for the meshdump binary: target resolution,
//! artifact collection, and multi-format archive assembly. The modules
//! are usable as a library so tests (and embedders) can drive the engine
//! with their own `ClusterQuery` implementation and output sinks.

pub mod archive;
pub mod bugreport;
pub mod cli;
pub mod collector;
pub mod constants;
pub mod kube;
pub mod models;
pub mod resolver;

// Re-export commonly used types for convenience
pub use archive::{ArchiveDescriptor, ArchiveFormat, ArchiveHandle};
pub use bugreport::{BugReport, RunOutcome};
pub use collector::Collector;
pub use kube::{ClusterQuery, KubeClusterQuery};
pub use models::{
    ArtifactBlob, CollectionReport, CollectionStatus, ReportEntry, ReportSubject, ResourceRef,
    TargetSpec,
};
pub use resolver::{Resolution, resolve};
