//! Resolution of asset source/destination pairs against the build roots
//!
//! A [`CopyRequest`] holds the two path strings exactly as they were configured. Relative
//! components are interpreted against their root: the source against the input root and the
//! destination against the output root. Absolute components are taken as they are.
//!
//! # Copy Semantics
//!
//! - **Without trailing slash**: the destination is the final name
//!   - `images -> public` copies to `<output>/public`
//! - **With trailing slash**: the destination is a directory to copy into, created if missing
//!   - `images/logo.svg -> icons/` copies to `<output>/icons/logo.svg`
//!   - `images -> public/` copies the contents of `images` to `<output>/public`
//!
//! When the restrictive mode is on, both paths must stay within their roots after lexical
//! normalization. Symlinked ancestors are NOT canonicalized before the check.

use std::path::{Component, Path, PathBuf};

use tracing::instrument;

use crate::roots::Roots;

/// One configured asset: a source path and a destination path, as written by the user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CopyRequest {
    pub from: String,
    pub to: String,
}

impl CopyRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl std::fmt::Display for CopyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "'{}' -> '{}'", self.from, self.to)
    }
}

/// Absolute, normalized source and destination of a single asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub from: PathBuf,
    pub to: PathBuf,
    /// `to` was written with a trailing separator and names the directory to copy into
    pub into_dir: bool,
}

impl ResolvedPaths {
    /// Path a file source ends up at
    #[must_use]
    pub fn target(&self) -> PathBuf {
        match self.from.file_name() {
            Some(name) if self.into_dir => self.to.join(name),
            _ => self.to.clone(),
        }
    }

    /// Whether the destination is the source itself or lies inside it
    #[must_use]
    pub fn overlaps(&self) -> bool {
        self.to.starts_with(&self.from) || self.target() == self.from
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("{side} path is empty")]
    EmptyPath { side: &'static str },
    #[error("source path {path:?} has no basename to copy into {to:?}")]
    NoBasename { path: String, to: String },
    #[error("source {path:?} escapes input root {root:?}")]
    SourceEscapesRoot { path: PathBuf, root: PathBuf },
    #[error("destination {path:?} escapes output root {root:?}")]
    DestinationEscapesRoot { path: PathBuf, root: PathBuf },
}

impl Error {
    #[must_use]
    pub fn is_containment(&self) -> bool {
        matches!(
            self,
            Error::SourceEscapesRoot { .. } | Error::DestinationEscapesRoot { .. }
        )
    }
}

/// Lexically normalizes `path`: drops `.` components and folds `..` into the preceding
/// component. Nothing is read from the filesystem, symlinks are left alone.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                // ".." of the filesystem root is the root itself
                Some(Component::RootDir | Component::Prefix(_)) => {}
                Some(Component::ParentDir | Component::CurDir) | None => normalized.push(".."),
            },
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Whether `to` uses the "copy into this directory" shorthand, i.e. ends with a separator.
#[must_use]
pub fn is_into_dir(to: &str) -> bool {
    to.ends_with(std::path::is_separator)
}

fn within(root: &Path, component: &str) -> Option<PathBuf> {
    let path = normalize(&root.join(component));
    path.starts_with(root).then_some(path)
}

/// Resolves one request against the build roots.
///
/// With `restrictive` set, a source outside the input root or a destination outside the
/// output root is rejected. Otherwise any pair is accepted, relative components still being
/// anchored at their roots.
#[instrument(skip(roots))]
pub fn resolve(
    request: &CopyRequest,
    roots: &Roots,
    restrictive: bool,
) -> Result<ResolvedPaths, Error> {
    if request.from.is_empty() {
        return Err(Error::EmptyPath { side: "source" });
    }
    if request.to.is_empty() {
        return Err(Error::EmptyPath {
            side: "destination",
        });
    }
    let into_dir = is_into_dir(&request.to);
    if into_dir && Path::new(&request.from).file_name().is_none() {
        return Err(Error::NoBasename {
            path: request.from.clone(),
            to: request.to.clone(),
        });
    }
    if !restrictive {
        tracing::debug!("restrictive mode is off, skipping containment checks");
        return Ok(ResolvedPaths {
            from: normalize(&roots.source().join(&request.from)),
            to: normalize(&roots.dest().join(&request.to)),
            into_dir,
        });
    }
    let from = within(roots.source(), &request.from).ok_or_else(|| Error::SourceEscapesRoot {
        path: PathBuf::from(&request.from),
        root: roots.source().to_path_buf(),
    })?;
    let to = within(roots.dest(), &request.to).ok_or_else(|| Error::DestinationEscapesRoot {
        path: PathBuf::from(&request.to),
        root: roots.dest().to_path_buf(),
    })?;
    Ok(ResolvedPaths { from, to, into_dir })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roots() -> Roots {
        Roots::new("/proj/src", "/proj/dist").unwrap()
    }

    #[test]
    fn test_normalize_folds_parent_and_current() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/b/../../..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("a/..")), PathBuf::from(""));
        assert_eq!(normalize(Path::new("../../a")), PathBuf::from("../../a"));
        assert_eq!(normalize(Path::new("./a/")), PathBuf::from("a"));
    }

    #[test]
    fn test_is_into_dir() {
        assert!(is_into_dir("dist/"));
        assert!(is_into_dir("./"));
        assert!(!is_into_dir("dist/brand.svg"));
        assert!(!is_into_dir("."));
    }

    #[test]
    fn test_resolve_no_basename() {
        let result = resolve(&CopyRequest::new("..", "public/"), &roots(), false);
        assert!(matches!(result, Err(Error::NoBasename { .. })));
        // without the shorthand no basename is needed
        assert!(resolve(&CopyRequest::new("images/..", "public"), &roots(), true).is_ok());
    }

    #[test]
    fn test_resolve_relative_pair() {
        let paths = resolve(&CopyRequest::new("images", "dist-images"), &roots(), true).unwrap();
        assert_eq!(paths.from, PathBuf::from("/proj/src/images"));
        assert_eq!(paths.to, PathBuf::from("/proj/dist/dist-images"));
        assert!(!paths.into_dir);
        assert_eq!(paths.target(), paths.to);
    }

    #[test]
    fn test_resolve_copy_into_directory() {
        let paths = resolve(&CopyRequest::new("assets/logo.svg", "img/"), &roots(), true).unwrap();
        assert_eq!(paths.from, PathBuf::from("/proj/src/assets/logo.svg"));
        assert_eq!(paths.to, PathBuf::from("/proj/dist/img"));
        assert!(paths.into_dir);
        assert_eq!(paths.target(), PathBuf::from("/proj/dist/img/logo.svg"));
    }

    #[test]
    fn test_resolve_copy_into_output_root() {
        let paths = resolve(&CopyRequest::new("robots.txt", "./"), &roots(), true).unwrap();
        assert_eq!(paths.to, PathBuf::from("/proj/dist"));
        assert_eq!(paths.target(), PathBuf::from("/proj/dist/robots.txt"));
    }

    #[test]
    fn test_resolve_into_directory_escape() {
        let result = resolve(&CopyRequest::new("a.txt", "../"), &roots(), true);
        assert!(matches!(result, Err(Error::DestinationEscapesRoot { .. })));
    }

    #[test]
    fn test_overlapping_source_and_destination() {
        let roots = Roots::new("/proj", "/proj/dist").unwrap();
        let nested = resolve(&CopyRequest::new(".", "site"), &roots, true).unwrap();
        assert!(nested.overlaps());
        let itself = resolve(&CopyRequest::new("dist/a.txt", "a.txt"), &roots, true).unwrap();
        assert!(itself.overlaps());
        let itself_into = resolve(&CopyRequest::new("dist/a.txt", "./"), &roots, true).unwrap();
        assert!(itself_into.overlaps());
        let apart = resolve(&CopyRequest::new("src/images", "images/"), &roots, true).unwrap();
        assert!(!apart.overlaps());
    }

    #[test]
    fn test_resolve_redundant_segments_are_normalized() {
        let paths = resolve(
            &CopyRequest::new("./fonts/../images/./a.png", "x/../y.png"),
            &roots(),
            true,
        )
        .unwrap();
        assert_eq!(paths.from, PathBuf::from("/proj/src/images/a.png"));
        assert_eq!(paths.to, PathBuf::from("/proj/dist/y.png"));
    }

    #[test]
    fn test_resolve_absolute_inside_root_allowed() {
        let paths = resolve(
            &CopyRequest::new("/proj/src/robots.txt", "/proj/dist/robots.txt"),
            &roots(),
            true,
        )
        .unwrap();
        assert_eq!(paths.from, PathBuf::from("/proj/src/robots.txt"));
        assert_eq!(paths.to, PathBuf::from("/proj/dist/robots.txt"));
    }

    #[test]
    fn test_resolve_destination_equal_to_root() {
        let paths = resolve(&CopyRequest::new("static", "."), &roots(), true).unwrap();
        assert_eq!(paths.to, PathBuf::from("/proj/dist"));
    }

    #[test]
    fn test_resolve_source_escape() {
        let result = resolve(&CopyRequest::new("../outside.txt", "x.txt"), &roots(), true);
        let error = result.unwrap_err();
        assert!(error.is_containment());
        assert!(error.to_string().contains("escapes input root"));
    }

    #[test]
    fn test_resolve_source_prefix_sibling_escape() {
        // "/proj/src-old" shares a string prefix with the root but is not inside it
        let result = resolve(&CopyRequest::new("/proj/src-old/a", "a"), &roots(), true);
        assert!(matches!(result, Err(Error::SourceEscapesRoot { .. })));
    }

    #[test]
    fn test_resolve_destination_escape() {
        let result = resolve(&CopyRequest::new("a.txt", "../../etc/a.txt"), &roots(), true);
        let error = result.unwrap_err();
        assert!(matches!(error, Error::DestinationEscapesRoot { .. }));
        assert!(error.to_string().contains("escapes output root"));
    }

    #[test]
    fn test_resolve_escape_allowed_when_not_restrictive() {
        let paths = resolve(
            &CopyRequest::new("../outside.txt", "../../tmp/x.txt"),
            &roots(),
            false,
        )
        .unwrap();
        assert_eq!(paths.from, PathBuf::from("/proj/outside.txt"));
        assert_eq!(paths.to, PathBuf::from("/tmp/x.txt"));
    }

    #[test]
    fn test_resolve_empty_paths() {
        assert_eq!(
            resolve(&CopyRequest::new("", "a"), &roots(), true),
            Err(Error::EmptyPath { side: "source" })
        );
        assert_eq!(
            resolve(&CopyRequest::new("a", ""), &roots(), false),
            Err(Error::EmptyPath {
                side: "destination"
            })
        );
    }

    fn component() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("..".to_string()),
            Just(".".to_string()),
            Just("src".to_string()),
            "[a-z]{1,6}",
        ]
    }

    proptest! {
        #[test]
        fn resolved_paths_stay_within_roots(
            from in prop::collection::vec(component(), 1..6),
            to in prop::collection::vec(component(), 1..6),
        ) {
            let request = CopyRequest::new(from.join("/"), to.join("/"));
            if let Ok(paths) = resolve(&request, &roots(), true) {
                prop_assert!(paths.from.starts_with("/proj/src"));
                prop_assert!(paths.to.starts_with("/proj/dist"));
                prop_assert!(paths.from.components().all(|c| matches!(c, Component::RootDir | Component::Normal(_))));
                prop_assert!(paths.to.components().all(|c| matches!(c, Component::RootDir | Component::Normal(_))));
            }
        }

        #[test]
        fn leading_parent_traversal_is_rejected(
            names in prop::collection::vec("[a-z]{1,6}", 0..4),
        ) {
            // after "..", only names that can not re-enter "src" follow
            prop_assume!(names.first().is_none_or(|name| name != "src"));
            let mut from = vec!["..".to_string()];
            from.extend(names);
            let result = resolve(&CopyRequest::new(from.join("/"), "x.txt"), &roots(), true);
            let is_source_escape = matches!(result, Err(Error::SourceEscapesRoot { .. }));
            prop_assert!(is_source_escape);
        }
    }
}
