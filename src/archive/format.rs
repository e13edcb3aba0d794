//! Archive format inference from the output path
//!
//! The container format is chosen once, from the file extension, before
//! anything is written. Multi-part extensions are matched before their
//! single-part suffixes so `report.tar.gz` never reads as a bare `.gz`.

use std::path::{Path, PathBuf};

/// Supported archive container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    TarZstd,
    Zip,
}

impl ArchiveFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar+gzip",
            ArchiveFormat::TarBz2 => "tar+bzip2",
            ArchiveFormat::TarXz => "tar+xz",
            ArchiveFormat::TarZstd => "tar+zstd",
            ArchiveFormat::Zip => "zip",
        }
    }
}

/// Extension appended when the output path has no extension at all
pub const DEFAULT_EXTENSION: &str = ".tar.gz";

/// Recognized extensions, ordered with multi-part entries first so the
/// longest suffix wins.
const EXTENSION_TABLE: &[(&str, ArchiveFormat)] = &[
    (".tar.gz", ArchiveFormat::TarGz),
    (".tar.bz2", ArchiveFormat::TarBz2),
    (".tar.xz", ArchiveFormat::TarXz),
    (".tar.zst", ArchiveFormat::TarZstd),
    (".tgz", ArchiveFormat::TarGz),
    (".tbz2", ArchiveFormat::TarBz2),
    (".txz", ArchiveFormat::TarXz),
    (".tzst", ArchiveFormat::TarZstd),
    (".tar", ArchiveFormat::Tar),
    (".zip", ArchiveFormat::Zip),
];

/// The output target: final file path plus the container format inferred
/// from it. Derivation is deterministic; an unrecognized suffix maps to
/// the default compressed-tar container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    pub path: PathBuf,
    pub format: ArchiveFormat,
}

impl ArchiveDescriptor {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        for (extension, format) in EXTENSION_TABLE {
            // Require a non-empty stem: a file literally named ".tar" is
            // not a tar archive of nothing.
            if file_name.len() > extension.len() && file_name.ends_with(extension) {
                return Self {
                    path,
                    format: *format,
                };
            }
        }

        if file_name.contains('.') {
            // Unrecognized extension: fall back to the default container
            // without renaming the file the user asked for.
            Self {
                path,
                format: ArchiveFormat::TarGz,
            }
        } else {
            let mut renamed = path.into_os_string();
            renamed.push(DEFAULT_EXTENSION);
            Self {
                path: renamed.into(),
                format: ArchiveFormat::TarGz,
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
