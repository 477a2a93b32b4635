//! Per-build driver: resolves and copies every configured asset concurrently
//!
//! Failures never cross asset boundaries. Each asset ends up with an [`Outcome`]; the caller
//! decides how to report them (see [`Report::warnings`]).

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::instrument;

use crate::copy;
use crate::path::{self, CopyRequest, ResolvedPaths};
use crate::roots::Roots;

#[derive(Debug, Copy, Clone)]
pub struct Settings {
    /// Enforce that assets stay within the input and output roots
    pub restrictive: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error(transparent)]
    Resolve(#[from] path::Error),
    #[error(transparent)]
    Copy(#[from] copy::Error),
    #[error("destination {to:?} is already the target of asset {other}")]
    DuplicateDestination { to: PathBuf, other: CopyRequest },
    #[error("destination {to:?} overlaps source {from:?}")]
    DestinationOverlapsSource { from: PathBuf, to: PathBuf },
}

#[derive(Debug)]
pub enum Outcome {
    Copied {
        paths: ResolvedPaths,
        summary: copy::Summary,
    },
    Failed(AssetError),
}

#[derive(Debug)]
pub struct AssetReport {
    pub request: CopyRequest,
    pub outcome: Outcome,
}

/// User-facing description of a failed asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub asset: CopyRequest,
    pub message: String,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl AssetReport {
    #[must_use]
    pub fn warning(&self) -> Option<Warning> {
        let Outcome::Failed(error) = &self.outcome else {
            return None;
        };
        let message = match error {
            AssetError::Copy(error @ copy::Error::NotFound { .. }) => {
                format!("Asset {} does not exist. Error: {}", self.request, error)
            }
            error => format!(
                "Could not copy {} because of an error: {}",
                self.request, error
            ),
        };
        Some(Warning {
            asset: self.request.clone(),
            message,
        })
    }
}

/// Outcomes of one build, in configuration order
#[derive(Debug, Default)]
pub struct Report {
    pub assets: Vec<AssetReport>,
}

impl Report {
    pub fn warnings(&self) -> impl Iterator<Item = Warning> + '_ {
        self.assets.iter().filter_map(AssetReport::warning)
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.assets
            .iter()
            .filter(|asset| matches!(asset.outcome, Outcome::Failed(_)))
            .count()
    }

    /// Totals over all assets, including work done by assets that failed halfway
    #[must_use]
    pub fn summary(&self) -> copy::Summary {
        self.assets
            .iter()
            .fold(copy::Summary::default(), |total, asset| {
                total
                    + match &asset.outcome {
                        Outcome::Copied { summary, .. } => *summary,
                        Outcome::Failed(AssetError::Copy(error)) => error.summary(),
                        Outcome::Failed(_) => copy::Summary::default(),
                    }
            })
    }
}

/// Resolves all requests up front. Later requests targeting a destination already claimed
/// by an earlier one are rejected, as are destinations inside their own source.
fn resolve_all(
    requests: &[CopyRequest],
    roots: &Roots,
    settings: &Settings,
) -> Vec<Result<ResolvedPaths, AssetError>> {
    let mut claimed: HashMap<PathBuf, &CopyRequest> = HashMap::new();
    requests
        .iter()
        .map(|request| {
            let paths = path::resolve(request, roots, settings.restrictive)?;
            if paths.overlaps() {
                return Err(AssetError::DestinationOverlapsSource {
                    from: paths.from,
                    to: paths.to,
                });
            }
            let target = paths.target();
            if let Some(other) = claimed.get(&target) {
                return Err(AssetError::DuplicateDestination {
                    to: target,
                    other: (*other).clone(),
                });
            }
            claimed.insert(target, request);
            Ok(paths)
        })
        .collect()
}

async fn copy_asset(paths: &ResolvedPaths) -> Result<copy::Summary, copy::Error> {
    if paths.into_dir {
        copy::copy_into(&paths.from, &paths.to).await
    } else {
        copy::copy(&paths.from, &paths.to).await
    }
}

/// Copies every requested asset and waits until all of them settled.
///
/// All copies are issued together and interleave at their I/O calls; none of them can stop
/// another one from running.
#[instrument(skip(requests))]
pub async fn run_all(requests: &[CopyRequest], roots: &Roots, settings: &Settings) -> Report {
    let resolved = resolve_all(requests, roots, settings);
    let tasks = requests
        .iter()
        .zip(resolved)
        .map(|(request, resolved)| async move {
            let outcome = match resolved {
                Ok(paths) => match copy_asset(&paths).await {
                    Ok(summary) => Outcome::Copied { paths, summary },
                    Err(error) => Outcome::Failed(error.into()),
                },
                Err(error) => Outcome::Failed(error),
            };
            AssetReport {
                request: request.clone(),
                outcome,
            }
        });
    let assets = futures::future::join_all(tasks).await;
    tracing::debug!(
        "{} assets settled, {} failed",
        assets.len(),
        assets
            .iter()
            .filter(|asset| matches!(asset.outcome, Outcome::Failed(_)))
            .count()
    );
    Report { assets }
}
