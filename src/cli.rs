//! Command-line interface implementation

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::build::{BuildContext, BuildPipeline, ConsoleProgress, SystemRunner};
use crate::config::loader::{find_config, load_config, project_root};

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;

/// Build the simulation: element tables, atlas, shader and WebAssembly module
#[derive(Parser, Debug)]
#[command(name = "simforge")]
#[command(about = "Build the simulation: element tables, atlas, shader and WebAssembly module")]
#[command(version)]
pub struct Cli {
    /// Delete the previous build output before building
    #[arg(long)]
    pub clean: bool,
}

/// Entry point for the CLI
pub fn run() -> ExitCode {
    let _ = env_logger::try_init();
    let cli = Cli::parse();
    run_build(cli.clean)
}

/// Load the configuration and run the full build.
pub fn run_build(clean: bool) -> ExitCode {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let config_path = find_config();
    let config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let root = match &config_path {
        Some(path) => {
            log::debug!("using config {}", path.display());
            project_root(path).map(|p| p.to_path_buf()).unwrap_or_else(|| cwd.clone())
        }
        None => {
            log::debug!("no config file found, using defaults");
            cwd
        }
    };

    let context = BuildContext::new(config, root);
    let pipeline = BuildPipeline::new(context)
        .with_clean(clean)
        .with_runner(Box::new(SystemRunner))
        .with_reporter(Box::new(ConsoleProgress::new()));

    match pipeline.build() {
        Ok(result) => {
            log::debug!("{}", result.summary());
            ExitCode::from(EXIT_SUCCESS)
        }
        // The reporter has already printed the failing stage and its error.
        Err(e) => {
            log::debug!("build failed: {:?}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
