use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::instrument;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "assetcp",
    version,
    about = "Copy static assets from a project's input tree into the bundle output tree",
    long_about = "`assetcp` is the asset-copy stage of a build: it copies files and directories from the directory holding the build's entry points (the input root) into the directory the bundle is written to (the output root).

Assets that can not be copied are reported as warnings and never fail the build.

EXAMPLES:
    # Copy two assets next to dist/bundle.js
    assetcp --input src/index.js --file dist/bundle.js --asset images --asset robots.txt

    # Use a JSON configuration with explicit mappings
    assetcp --input src/index.js --dir dist --config assetcp.json

CONFIGURATION:
    {
      \"assets\": [\"favicon.ico\", { \"from\": \"images\", \"to\": \"static/\" }],
      \"verbose\": true,
      \"restrictive\": true
    }"
)]
struct Args {
    // Build options
    /// Entry point of the build; with several, the input root is their common directory
    #[arg(short, long, value_name = "PATH", required = true, action = clap::ArgAction::Append, help_heading = "Build")]
    input: Vec<std::path::PathBuf>,

    #[command(flatten)]
    output: Output,

    // Copy options
    /// JSON configuration file
    #[arg(short, long, value_name = "PATH", help_heading = "Copy options")]
    config: Option<std::path::PathBuf>,

    /// Asset to copy by basename into the output root (can be specified multiple times)
    ///
    /// Added after the assets of the configuration file.
    #[arg(short, long = "asset", value_name = "PATH", action = clap::ArgAction::Append, help_heading = "Copy options")]
    assets: Vec<String>,

    /// Allow sources outside the input root and destinations outside the output root
    #[arg(long, help_heading = "Copy options")]
    no_restrictive: bool,

    // Progress & output
    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Verbose level (implies logging each copied asset): -v INFO / -vv DEBUG / -vvv TRACE (default: WARN)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Quiet mode, don't report warnings
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,
}

#[derive(clap::Args, Debug, Clone)]
#[group(required = true, multiple = false)]
struct Output {
    /// Output file of the bundle, the output root is its directory
    #[arg(long, value_name = "PATH", help_heading = "Build")]
    file: Option<std::path::PathBuf>,

    /// Output directory of the bundle, used as the output root
    #[arg(long, value_name = "PATH", help_heading = "Build")]
    dir: Option<std::path::PathBuf>,
}

impl Output {
    fn target(&self) -> Result<common::OutputTarget> {
        match (&self.file, &self.dir) {
            (Some(file), None) => Ok(common::OutputTarget::File(file.clone())),
            (None, Some(dir)) => Ok(common::OutputTarget::Dir(dir.clone())),
            _ => Err(anyhow!("exactly one of --file and --dir must be given")),
        }
    }
}

impl Args {

    fn config(&self) -> Result<common::Config> {
        let mut config = match &self.config {
            Some(path) => common::Config::from_file(path)?,
            None => common::Config::default(),
        };
        config.assets.extend(
            self.assets
                .iter()
                .cloned()
                .map(common::config::Asset::Path),
        );
        if self.no_restrictive {
            config.restrictive = false;
        }
        if self.verbose > 0 {
            config.verbose = true;
        }
        Ok(config)
    }
}

#[instrument(skip(stage))]
async fn async_main(stage: common::CopyStage, args: Args) -> Result<common::Report> {
    let source = stage.build_start(args.input.as_slice())?;
    let report = stage
        .generate_bundle(&source, &args.output.target()?, |warning| {
            tracing::warn!("{}", warning);
        })
        .await?;
    Ok(report)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.config()?;
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose.max(u8::from(config.verbose)),
        print_summary: args.summary,
    };
    common::init_tracing(&output)?;
    let stage = common::CopyStage::new(config)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(async_main(stage, args))?;
    if output.print_summary {
        println!("{}", report.summary());
    }
    Ok(())
}
