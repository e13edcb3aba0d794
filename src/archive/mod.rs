//! Multi-format archive writer
//!
//! Accepts a stream of named byte blobs and writes them into a container
//! selected once at creation time from the output path's extension. The
//! handle is single-writer and append-only: blobs land in the container in
//! the order they are presented, each logical path at most once.

mod format;

pub use format::{ArchiveDescriptor, ArchiveFormat, DEFAULT_EXTENSION};

use crate::models::ArtifactBlob;
use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use xz2::write::XzEncoder;
use zstd::stream::write::Encoder as ZstdEncoder;

/// Archive writer errors. `DuplicateEntry` and `Closed` are contract
/// violations between the collector and the writer; `Io` covers the
/// underlying filesystem and codec failures. All are fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("duplicate archive entry: {0}")]
    DuplicateEntry(String),

    #[error("archive is closed")]
    Closed,

    #[error("archive I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip container failure: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// The closed set of container encodings behind one handle. Selected once
/// from the `ArchiveDescriptor`, never re-dispatched per write.
enum Container {
    Tar(tar::Builder<BufWriter<File>>),
    TarGz(tar::Builder<GzEncoder<BufWriter<File>>>),
    TarBz2(tar::Builder<BzEncoder<BufWriter<File>>>),
    TarXz(tar::Builder<XzEncoder<BufWriter<File>>>),
    TarZstd(tar::Builder<ZstdEncoder<'static, BufWriter<File>>>),
    Zip(Box<zip::ZipWriter<BufWriter<File>>>),
}

/// Open archive accepting `ArtifactBlob` writes.
pub struct ArchiveHandle {
    container: Option<Container>,
    seen_paths: HashSet<String>,
    path: PathBuf,
}

impl ArchiveHandle {
    /// Create the archive file (and any missing parent directories) and
    /// set up the container encoding named by the descriptor.
    pub fn create(descriptor: &ArchiveDescriptor) -> Result<Self, ArchiveError> {
        if let Some(parent) = descriptor.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let writer = BufWriter::new(File::create(&descriptor.path)?);

        let container = match descriptor.format {
            ArchiveFormat::Tar => Container::Tar(tar::Builder::new(writer)),
            ArchiveFormat::TarGz => Container::TarGz(tar::Builder::new(GzEncoder::new(
                writer,
                flate2::Compression::default(),
            ))),
            ArchiveFormat::TarBz2 => Container::TarBz2(tar::Builder::new(BzEncoder::new(
                writer,
                bzip2::Compression::default(),
            ))),
            ArchiveFormat::TarXz => Container::TarXz(tar::Builder::new(XzEncoder::new(writer, 6))),
            ArchiveFormat::TarZstd => {
                Container::TarZstd(tar::Builder::new(ZstdEncoder::new(writer, 0)?))
            }
            ArchiveFormat::Zip => Container::Zip(Box::new(zip::ZipWriter::new(writer))),
        };

        tracing::debug!(
            "Created {} archive at {}",
            descriptor.format.name(),
            descriptor.path.display()
        );

        Ok(Self {
            container: Some(container),
            seen_paths: HashSet::new(),
            path: descriptor.path.clone(),
        })
    }

    /// The path the archive is being written to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one blob. Each logical path must be unique within the
    /// archive; a repeat indicates a collector bug and aborts the run.
    pub fn write(&mut self, blob: &ArtifactBlob) -> Result<(), ArchiveError> {
        let container = self.container.as_mut().ok_or(ArchiveError::Closed)?;
        if !self.seen_paths.insert(blob.path.clone()) {
            return Err(ArchiveError::DuplicateEntry(blob.path.clone()));
        }

        match container {
            Container::Tar(builder) => append_tar_entry(builder, &blob.path, &blob.data)?,
            Container::TarGz(builder) => append_tar_entry(builder, &blob.path, &blob.data)?,
            Container::TarBz2(builder) => append_tar_entry(builder, &blob.path, &blob.data)?,
            Container::TarXz(builder) => append_tar_entry(builder, &blob.path, &blob.data)?,
            Container::TarZstd(builder) => append_tar_entry(builder, &blob.path, &blob.data)?,
            Container::Zip(writer) => {
                let options = zip::write::FileOptions::default()
                    .unix_permissions(0o644)
                    .last_modified_time(zip::DateTime::default());
                writer.start_file(blob.path.as_str(), options)?;
                writer.write_all(&blob.data)?;
            }
        }
        Ok(())
    }

    /// Flush and finalize the container (tar trailer, gzip footer, zip
    /// central directory). Safe to call again after a successful close;
    /// further writes fail with `Closed`.
    pub fn close(&mut self) -> Result<(), ArchiveError> {
        let Some(container) = self.container.take() else {
            return Ok(());
        };
        match container {
            Container::Tar(builder) => {
                builder.into_inner()?.flush()?;
            }
            Container::TarGz(builder) => {
                builder.into_inner()?.finish()?.flush()?;
            }
            Container::TarBz2(builder) => {
                builder.into_inner()?.finish()?.flush()?;
            }
            Container::TarXz(builder) => {
                builder.into_inner()?.finish()?.flush()?;
            }
            Container::TarZstd(builder) => {
                builder.into_inner()?.finish()?.flush()?;
            }
            Container::Zip(mut writer) => {
                writer.finish()?.flush()?;
            }
        }
        Ok(())
    }
}

/// Entry mtimes are pinned to zero so identical runs produce identical
/// bundles.
fn append_tar_entry<W: Write>(
    builder: &mut tar::Builder<W>,
    path: &str,
    data: &[u8],
) -> Result<(), ArchiveError> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();
    builder.append_data(&mut header, path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn blob(path: &str, data: &[u8]) -> ArtifactBlob {
        ArtifactBlob::new(path, data.to_vec(), None)
    }

    #[test]
    fn test_duplicate_entry_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = ArchiveDescriptor::from_path(dir.path().join("dup.tar.gz"));
        let mut handle = ArchiveHandle::create(&descriptor).unwrap();

        handle.write(&blob("targets/ns/pod/logs.txt", b"first")).unwrap();
        let err = handle
            .write(&blob("targets/ns/pod/logs.txt", b"second"))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::DuplicateEntry(p) if p == "targets/ns/pod/logs.txt"));
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = ArchiveDescriptor::from_path(dir.path().join("closed.tar"));
        let mut handle = ArchiveHandle::create(&descriptor).unwrap();
        handle.write(&blob("a.txt", b"a")).unwrap();
        handle.close().unwrap();

        let err = handle.write(&blob("b.txt", b"b")).unwrap_err();
        assert!(matches!(err, ArchiveError::Closed));
        // second close is a no-op
        handle.close().unwrap();
    }

    #[test]
    fn test_tar_gz_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = ArchiveDescriptor::from_path(dir.path().join("bundle.tar.gz"));
        let mut handle = ArchiveHandle::create(&descriptor).unwrap();
        handle.write(&blob("one.txt", b"hello")).unwrap();
        handle.write(&blob("sub/two.txt", b"world")).unwrap();
        handle.close().unwrap();

        let file = std::fs::File::open(descriptor.path()).unwrap();
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
        let mut entries = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            entries.push((path, content));
        }
        // write order is preserved
        assert_eq!(
            entries,
            vec![
                ("one.txt".to_string(), "hello".to_string()),
                ("sub/two.txt".to_string(), "world".to_string()),
            ]
        );
    }

    #[test]
    fn test_zip_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = ArchiveDescriptor::from_path(dir.path().join("bundle.zip"));
        let mut handle = ArchiveHandle::create(&descriptor).unwrap();
        handle.write(&blob("one.txt", b"hello")).unwrap();
        handle.close().unwrap();

        let file = std::fs::File::open(descriptor.path()).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut entry = archive.by_name("one.txt").unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");
    }

    #[test]
    fn test_create_makes_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c/bundle.tar");
        let descriptor = ArchiveDescriptor::from_path(&nested);
        let mut handle = ArchiveHandle::create(&descriptor).unwrap();
        handle.write(&blob("x.txt", b"x")).unwrap();
        handle.close().unwrap();
        assert!(nested.exists());
    }
}
