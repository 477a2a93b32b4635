//! Common library for the `assetcp` build stage
//!
//! The stage copies static assets (images, fonts, `robots.txt`, ...) from a project's input
//! tree into the output tree of a bundle. It is organized in layers:
//!
//! - [`path`] - normalizes configured source/destination pairs and enforces containment
//! - [`copy`] - copies one file or one directory tree
//! - [`assets`] - runs all assets of a build concurrently and collects their outcomes
//! - [`stage`] - ties the above to a host build's lifecycle
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> anyhow::Result<()> {
//! let config = common::Config::from_json(r#"{"assets": ["images", "robots.txt"]}"#)?;
//! let stage = common::CopyStage::new(config)?;
//! let source = stage.build_start(&["src/index.js"])?;
//! let output = common::OutputTarget::File("dist/bundle.js".into());
//! stage
//!     .generate_bundle(&source, &output, |warning| eprintln!("{warning}"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use anyhow::anyhow;

pub mod assets;
pub mod config;
pub mod copy;
pub mod path;
pub mod roots;
pub mod stage;

#[cfg(test)]
mod testutils;

pub use assets::{Report, Warning};
pub use config::Config;
pub use path::CopyRequest;
pub use roots::{OutputTarget, Roots, SourceRoot};
pub use stage::CopyStage;

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress warnings, only errors are printed
    pub quiet: bool,
    /// Verbosity level: 0=WARN, 1=INFO, 2=DEBUG, 3=TRACE
    pub verbose: u8,
    /// Print summary statistics at the end
    pub print_summary: bool,
}

impl OutputConfig {
    fn level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Sets up the global `tracing` subscriber writing to stderr. `RUST_LOG` takes precedence over
/// the configured verbosity.
pub fn init_tracing(output: &OutputConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(output.level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
}
