//! Core data model for bug-report collection
//!
//! Value types shared by the resolver, collector, and archive writer:
//! resource identifiers, target specifications, collected artifacts, and
//! the per-run collection report.

use serde::Serialize;
use std::fmt;

/// Separator between namespace and name in user-supplied identifiers
pub const IDENTIFIER_SEPARATOR: char = '/';

/// Errors from parsing user-supplied resource identifiers
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("malformed identifier '{0}': expected exactly one '/' separating non-empty namespace and name")]
    Malformed(String),
}

/// A single addressable cluster object, identified by (namespace, name).
///
/// Immutable value object. Equality and hashing are over the pair, so a
/// resolved target set never holds two refs to the same object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceRef {
    pub namespace: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse a `namespace/name` identifier.
    ///
    /// The input must contain exactly one separator splitting it into two
    /// non-empty segments; anything else is malformed.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        let mut segments = s.split(IDENTIFIER_SEPARATOR);
        match (segments.next(), segments.next(), segments.next()) {
            (Some(namespace), Some(name), None) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            _ => Err(IdentifierError::Malformed(s.to_string())),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, IDENTIFIER_SEPARATOR, self.name)
    }
}

/// The user's collection request.
///
/// `All` carries no explicit lists: wildcard mode discovers targets from
/// the cluster and explicit inputs are ignored by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// Collect from every pod in every monitored namespace
    All,
    /// Collect from explicitly named resources
    Explicit {
        namespaces: Vec<String>,
        deployments: Vec<String>,
        pods: Vec<String>,
    },
}

impl TargetSpec {
    /// Build a spec from CLI flags. `--all` takes precedence over any
    /// explicit lists supplied alongside it.
    pub fn from_flags(
        all: bool,
        namespaces: Vec<String>,
        deployments: Vec<String>,
        pods: Vec<String>,
    ) -> Self {
        if all {
            TargetSpec::All
        } else {
            TargetSpec::Explicit {
                namespaces,
                deployments,
                pods,
            }
        }
    }
}

/// One collected diagnostic item, addressed by its logical path inside
/// the archive.
///
/// `data` may be empty when collection only partially succeeded; the blob
/// is still emitted with `partial` set so the archive never silently
/// drops an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactBlob {
    /// Logical path within the archive, unique per archive
    pub path: String,
    pub data: Vec<u8>,
    /// The resource this artifact was collected from, if any
    pub source: Option<ResourceRef>,
    /// Marks artifacts whose collection failed or was incomplete
    pub partial: bool,
}

impl ArtifactBlob {
    pub fn new(path: impl Into<String>, data: Vec<u8>, source: Option<ResourceRef>) -> Self {
        Self {
            path: path.into(),
            data,
            source,
            partial: false,
        }
    }

    /// An empty placeholder for an artifact whose fetch failed.
    pub fn partial(path: impl Into<String>, source: Option<ResourceRef>) -> Self {
        Self {
            path: path.into(),
            data: Vec::new(),
            source,
            partial: true,
        }
    }
}

/// What a report entry is about: the control-plane namespace, a
/// pass-through application namespace, or a concrete target resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReportSubject {
    ControlPlane(String),
    Namespace(String),
    Target(ResourceRef),
}

impl fmt::Display for ReportSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportSubject::ControlPlane(ns) => write!(f, "control-plane namespace {}", ns),
            ReportSubject::Namespace(ns) => write!(f, "namespace {}", ns),
            ReportSubject::Target(r) => write!(f, "target {}", r),
        }
    }
}

/// Outcome of collecting one subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CollectionStatus {
    /// Every artifact kind was collected
    Succeeded,
    /// At least one artifact kind was collected, at least one failed
    Partial,
    /// No artifact kind could be collected
    Failed,
    /// The run deadline expired before this subject was collected
    Cancelled,
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CollectionStatus::Succeeded => "succeeded",
            CollectionStatus::Partial => "partial",
            CollectionStatus::Failed => "failed",
            CollectionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Per-subject outcome within a run
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub subject: ReportSubject,
    pub status: CollectionStatus,
    /// Reasons for each artifact kind that could not be collected
    pub failures: Vec<String>,
}

/// Outcome of one collection run. Every requested subject appears in
/// `entries` exactly once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionReport {
    pub entries: Vec<ReportEntry>,
}

impl CollectionReport {
    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub fn count(&self, status: CollectionStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    /// Render the report as the text placed into the bundle and echoed
    /// to the diagnostic stream.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&format!("{}: {}\n", entry.subject, entry.status));
            for failure in &entry.failures {
                out.push_str(&format!("  - {}\n", failure));
            }
        }
        out
    }
}
