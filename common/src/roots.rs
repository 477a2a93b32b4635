//! Discovery of the input and output roots of a build
//!
//! The input root is known at build start, the output root only once the bundle is being
//! generated. The two steps hand over explicit values ([`SourceRoot`], then [`Roots`]) instead
//! of sharing mutable state, so concurrent builds in one process do not interfere.

use std::path::{Path, PathBuf};

use crate::path::normalize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no entry point given, cannot determine the input root")]
    NoEntries,
    #[error("output file {path:?} has no parent directory")]
    NoParent { path: PathBuf },
    #[error("cannot make {path:?} absolute")]
    Absolute {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the host writes the bundle: a single output file or an output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Dir(PathBuf),
}

fn parent_or_current(path: &Path) -> Option<&Path> {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Some(Path::new(".")),
        parent => parent,
    }
}

fn absolute(path: &Path) -> Result<PathBuf, Error> {
    let path = std::path::absolute(path).map_err(|source| Error::Absolute {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(normalize(&path))
}

fn common_ancestor(lhs: &Path, rhs: &Path) -> PathBuf {
    lhs.components()
        .zip(rhs.components())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a)
        .collect()
}

/// Directory every asset source is resolved against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot(PathBuf);

impl SourceRoot {
    /// Derives the input root from the build's entry points: the common directory of all of them.
    pub fn from_entries<P: AsRef<Path>>(entries: &[P]) -> Result<Self, Error> {
        let mut root: Option<PathBuf> = None;
        for entry in entries {
            let entry = entry.as_ref();
            let dir = parent_or_current(entry).ok_or_else(|| Error::NoParent {
                path: entry.to_path_buf(),
            })?;
            let dir = absolute(dir)?;
            root = Some(match root {
                Some(root) => common_ancestor(&root, &dir),
                None => dir,
            });
        }
        root.map(SourceRoot).ok_or(Error::NoEntries)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Completes the build context once the output location is known.
    pub fn with_output(&self, output: &OutputTarget) -> Result<Roots, Error> {
        let dest = match output {
            OutputTarget::Dir(dir) => dir.as_path(),
            OutputTarget::File(file) => {
                parent_or_current(file).ok_or_else(|| Error::NoParent { path: file.clone() })?
            }
        };
        Ok(Roots {
            source: self.0.clone(),
            dest: absolute(dest)?,
        })
    }
}

/// Absolute, normalized input and output roots of one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roots {
    source: PathBuf,
    dest: PathBuf,
}

impl Roots {
    pub fn new(source: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self {
            source: absolute(source.as_ref())?,
            dest: absolute(dest.as_ref())?,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }
}
