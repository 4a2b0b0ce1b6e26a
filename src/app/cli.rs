use std::path::PathBuf;

use clap::Parser;

use crate::config::DEFAULT_CONFIG_PATH;
use crate::manager::orchestrator::RunOptions;
use crate::manifest::DEFAULT_PROCFILE_PATH;

#[derive(Parser, Debug)]
#[command(
    name = "app_runner",
    version,
    about = "Run application setup steps in parallel and write a Procfile"
)]
pub struct Cli {
    /// Application config to read.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Where to write the Procfile once every application succeeds.
    #[arg(short, long, default_value = DEFAULT_PROCFILE_PATH)]
    pub procfile: PathBuf,

    /// Number of applications to run at once (overrides `common.workers`).
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Print prefixes without ANSI colors.
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            procfile: self.procfile.clone(),
            workers: self.workers,
            colored: !self.no_color && std::env::var_os("NO_COLOR").is_none(),
        }
    }
}
