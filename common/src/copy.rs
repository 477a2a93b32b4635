use std::path::Path;

use anyhow::{anyhow, Context};
use async_recursion::async_recursion;
use tracing::instrument;

/// Error type for copy operations that preserves operation summary even on failure.
///
/// # Logging Convention
/// The Display implementation automatically shows the full error chain, so you can log it
/// with any format specifier:
/// ```ignore
/// tracing::warn!("copy failed: {}", &error);   // ✅ Shows full chain
/// tracing::warn!("copy failed: {:#}", &error); // ✅ Shows full chain
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source could not be inspected at all, nothing was copied
    #[error("cannot read metadata of {path:?}: {source}")]
    NotFound {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{source:#}")]
    Io {
        #[source]
        source: anyhow::Error,
        summary: Summary,
    },
}

impl Error {
    #[must_use]
    pub fn io(source: anyhow::Error, summary: Summary) -> Self {
        Error::Io { source, summary }
    }

    /// Work completed before the failure
    #[must_use]
    pub fn summary(&self) -> Summary {
        match self {
            Error::NotFound { .. } => Summary::default(),
            Error::Io { summary, .. } => *summary,
        }
    }

    fn into_anyhow(self) -> anyhow::Error {
        match self {
            Error::NotFound { path, source } => {
                anyhow::Error::new(source).context(format!("cannot read metadata of {path:?}"))
            }
            Error::Io { source, .. } => source,
        }
    }
}

/// Classification of a filesystem entry, symlinks are not followed
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// symlinks, sockets, devices, fifos - never copied
    Other,
}

impl EntryKind {
    #[must_use]
    pub fn of(file_type: std::fs::FileType) -> Self {
        if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub bytes_copied: u64,
    pub files_copied: usize,
    pub directories_created: usize,
    pub directories_unchanged: usize,
    pub entries_skipped: usize,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            bytes_copied: self.bytes_copied + other.bytes_copied,
            files_copied: self.files_copied + other.files_copied,
            directories_created: self.directories_created + other.directories_created,
            directories_unchanged: self.directories_unchanged + other.directories_unchanged,
            entries_skipped: self.entries_skipped + other.entries_skipped,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "bytes copied: {}\n\
            files copied: {}\n\
            directories created: {}\n\
            directories unchanged: {}\n\
            entries skipped: {}",
            bytesize::ByteSize(self.bytes_copied),
            self.files_copied,
            self.directories_created,
            self.directories_unchanged,
            self.entries_skipped,
        )
    }
}

/// Copies a single regular file, overwriting `dst`. The parent of `dst` must exist.
#[instrument]
pub async fn copy_file(src: &Path, dst: &Path) -> Result<Summary, Error> {
    tracing::debug!("copying data");
    let bytes_copied = tokio::fs::copy(src, dst)
        .await
        .with_context(|| format!("failed copying {:?} to {:?}", &src, &dst))
        .map_err(|err| Error::io(err, Summary::default()))?;
    Ok(Summary {
        bytes_copied,
        files_copied: 1,
        ..Default::default()
    })
}

async fn ensure_dir(dst: &Path) -> Result<Summary, Error> {
    match tokio::fs::create_dir(dst).await {
        Ok(()) => Ok(Summary {
            directories_created: 1,
            ..Default::default()
        }),
        Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
            let dst_metadata = tokio::fs::metadata(dst)
                .await
                .with_context(|| format!("failed reading metadata from dst: {:?}", &dst))
                .map_err(|err| Error::io(err, Summary::default()))?;
            if !dst_metadata.is_dir() {
                return Err(Error::io(
                    anyhow!("destination {:?} exists and is not a directory", dst),
                    Summary::default(),
                ));
            }
            tracing::debug!("'dst' is a directory, leaving it as is");
            Ok(Summary {
                directories_unchanged: 1,
                ..Default::default()
            })
        }
        Err(error) => Err(Error::io(
            anyhow::Error::new(error).context(format!("cannot create directory {dst:?}")),
            Summary::default(),
        )),
    }
}

async fn copy_entry(kind: EntryKind, src: &Path, dst: &Path) -> Result<Summary, Error> {
    match kind {
        EntryKind::File => copy_file(src, dst).await,
        EntryKind::Directory => copy_dir(src, dst).await,
        EntryKind::Other => {
            tracing::debug!("{:?} is neither a file nor a directory, skipping", src);
            Ok(Summary {
                entries_skipped: 1,
                ..Default::default()
            })
        }
    }
}

/// Copies the contents of directory `src` into `dst`, creating `dst` if needed.
///
/// Every entry is copied by its own task. A failing entry does not stop its siblings; the
/// first failure is returned once all of them settled, together with the summary of what
/// was copied.
#[instrument]
#[async_recursion]
pub async fn copy_dir(src: &Path, dst: &Path) -> Result<Summary, Error> {
    tracing::debug!("process contents of 'src' directory");
    let mut entries = tokio::fs::read_dir(src)
        .await
        .with_context(|| format!("cannot open directory {src:?} for reading"))
        .map_err(|err| Error::io(err, Summary::default()))?;
    let mut copy_summary = ensure_dir(dst).await?;
    let mut join_set = tokio::task::JoinSet::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed traversing src directory {:?}", &src))
        .map_err(|err| Error::io(err, copy_summary))?
    {
        let entry_path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .with_context(|| format!("failed reading file type of {:?}", &entry_path))
            .map_err(|err| Error::io(err, copy_summary))?;
        let kind = EntryKind::of(file_type);
        let dst_path = dst.join(entry.file_name());
        let do_copy = || async move { copy_entry(kind, &entry_path, &dst_path).await };
        join_set.spawn(do_copy());
    }
    drop(entries);
    let mut failures = 0;
    let mut first_error = None;
    while let Some(res) = join_set.join_next().await {
        let error = match res {
            Ok(Ok(summary)) => {
                copy_summary = copy_summary + summary;
                continue;
            }
            Ok(Err(error)) => {
                copy_summary = copy_summary + error.summary();
                error.into_anyhow()
            }
            Err(error) => anyhow::Error::new(error).context("copy task did not complete"),
        };
        tracing::debug!("copy under {:?} failed with: {:#}", src, &error);
        failures += 1;
        if first_error.is_none() {
            first_error = Some(error);
        }
    }
    if let Some(error) = first_error {
        return Err(Error::io(
            error.context(format!(
                "copy: {src:?} -> {dst:?} failed for {failures} entries"
            )),
            copy_summary,
        ));
    }
    Ok(copy_summary)
}

async fn source_kind(src: &Path) -> Result<EntryKind, Error> {
    tracing::debug!("reading source metadata");
    let src_metadata =
        tokio::fs::symlink_metadata(src)
            .await
            .map_err(|source| Error::NotFound {
                path: src.to_path_buf(),
                source,
            })?;
    Ok(EntryKind::of(src_metadata.file_type()))
}

async fn create_dir_all(dir: &Path) -> Result<(), Error> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("cannot create directory {dir:?}"))
        .map_err(|err| Error::io(err, Summary::default()))
}

/// Copies `src` to `dst`: a file is copied as-is, a directory recursively.
///
/// The source is inspected without following symlinks. Anything that is neither a regular
/// file nor a directory is skipped without error.
#[instrument]
pub async fn copy(src: &Path, dst: &Path) -> Result<Summary, Error> {
    let kind = source_kind(src).await?;
    copy_entry(kind, src, dst).await
}

/// Copies `src` into the directory `dir`, creating `dir` and its missing parents.
///
/// A file keeps its name inside `dir`. For a directory, its contents are merged into `dir`
/// rather than the directory itself being nested below it.
#[instrument]
pub async fn copy_into(src: &Path, dir: &Path) -> Result<Summary, Error> {
    let kind = source_kind(src).await?;
    match kind {
        EntryKind::File => {
            let name = src.file_name().ok_or_else(|| {
                Error::io(anyhow!("source {:?} has no file name", src), Summary::default())
            })?;
            create_dir_all(dir).await?;
            copy_file(src, &dir.join(name)).await
        }
        EntryKind::Directory => {
            // `copy_dir` creates `dir` itself
            if let Some(parent) = dir.parent() {
                create_dir_all(parent).await?;
            }
            copy_dir(src, dir).await
        }
        EntryKind::Other => copy_entry(kind, src, dir).await,
    }
}
