//! Configuration record of the copy stage
//!
//! The record mirrors the options object a bundler plugin receives and is usually read from
//! a JSON file:
//!
//! ```json
//! {
//!   "assets": ["favicon.ico", { "from": "images", "to": "static/" }],
//!   "verbose": true,
//!   "restrictive": true
//! }
//! ```
//!
//! Plain strings are copied by basename into the output root, `{from, to}` objects map a
//! source to an explicit destination.

use std::path::{Path, PathBuf};

use crate::path::CopyRequest;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read configuration file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("asset #{index}: {side} path is empty")]
    EmptyPath { index: usize, side: &'static str },
    #[error("asset #{index}: {path:?} has no basename")]
    NoBasename { index: usize, path: String },
}

/// A single entry of the `assets` list
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(untagged)]
pub enum Asset {
    Path(String),
    Mapping { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(alias = "copy")]
    pub assets: Vec<Asset>,
    /// Log every successfully copied asset
    pub verbose: bool,
    /// Accepted for compatibility, destination files are always overwritten
    pub overwrite: bool,
    /// Reject sources outside the input root and destinations outside the output root
    #[serde(alias = "containment")]
    pub restrictive: bool,
    /// Accepted for compatibility, not used when copying
    pub include: String,
    /// Accepted for compatibility, not used when copying
    pub prepend: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets: Vec::new(),
            verbose: false,
            overwrite: true,
            restrictive: true,
            include: "*.svg".to_string(),
            prepend: "**/".to_string(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Validates the asset list and turns it into copy requests, in configuration order.
    pub fn requests(&self) -> Result<Vec<CopyRequest>, Error> {
        self.assets
            .iter()
            .enumerate()
            .map(|(index, asset)| match asset {
                Asset::Path(path) => {
                    if path.is_empty() {
                        return Err(Error::EmptyPath {
                            index,
                            side: "source",
                        });
                    }
                    let basename = Path::new(path).file_name().ok_or_else(|| Error::NoBasename {
                        index,
                        path: path.clone(),
                    })?;
                    Ok(CopyRequest::new(
                        path.clone(),
                        basename.to_string_lossy().to_string(),
                    ))
                }
                Asset::Mapping { from, to } => {
                    if from.is_empty() {
                        return Err(Error::EmptyPath {
                            index,
                            side: "source",
                        });
                    }
                    if to.is_empty() {
                        return Err(Error::EmptyPath {
                            index,
                            side: "destination",
                        });
                    }
                    Ok(CopyRequest::new(from.clone(), to.clone()))
                }
            })
            .collect()
    }
}
