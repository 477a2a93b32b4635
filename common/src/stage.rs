//! Build-lifecycle adapter of the copy stage
//!
//! A host build tool drives the stage in two steps:
//!
//! 1. [`CopyStage::build_start`] with the resolved entry points, giving the [`SourceRoot`]
//! 2. [`CopyStage::generate_bundle`] with the output location, copying every asset
//!
//! The second step only fails when the output root can not be determined. Asset failures are
//! handed to the warning callback and the returned future resolves once every asset settled.

use std::path::Path;

use tracing::instrument;

use crate::assets::{self, Outcome, Report, Warning};
use crate::config::{self, Config};
use crate::path::CopyRequest;
use crate::roots::{self, OutputTarget, SourceRoot};

#[derive(Debug)]
pub struct CopyStage {
    config: Config,
    requests: Vec<CopyRequest>,
}

impl CopyStage {
    /// Name the stage reports itself with
    pub const NAME: &'static str = "assetcp";

    /// Validates the configuration eagerly, before any build starts.
    pub fn new(config: Config) -> Result<Self, config::Error> {
        let requests = config.requests()?;
        if !config.overwrite {
            tracing::debug!("'overwrite' is disabled but destination files are always overwritten");
        }
        Ok(Self { config, requests })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn requests(&self) -> &[CopyRequest] {
        &self.requests
    }

    #[instrument(skip(self, entries))]
    pub fn build_start<P: AsRef<Path>>(&self, entries: &[P]) -> Result<SourceRoot, roots::Error> {
        let source = SourceRoot::from_entries(entries)?;
        tracing::debug!("input root: {:?}", source.path());
        Ok(source)
    }

    #[instrument(skip(self, on_warning))]
    pub async fn generate_bundle<F>(
        &self,
        source: &SourceRoot,
        output: &OutputTarget,
        mut on_warning: F,
    ) -> Result<Report, roots::Error>
    where
        F: FnMut(&Warning),
    {
        let roots = source.with_output(output)?;
        tracing::debug!("output root: {:?}", roots.dest());
        let settings = assets::Settings {
            restrictive: self.config.restrictive,
        };
        let report = assets::run_all(&self.requests, &roots, &settings).await;
        for asset in &report.assets {
            match &asset.outcome {
                Outcome::Copied { paths, .. } => {
                    if self.config.verbose {
                        tracing::info!("Copying asset from {:?} to {:?}", paths.from, paths.to);
                    }
                }
                Outcome::Failed(_) => {
                    if let Some(warning) = asset.warning() {
                        on_warning(&warning);
                    }
                }
            }
        }
        Ok(report)
    }
}
