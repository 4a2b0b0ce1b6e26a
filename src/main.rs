use std::io;
use std::process;

use clap::Parser;

use app_runner::app::cli::Cli;
use app_runner::config::Config;
use app_runner::exit_codes;
use app_runner::logging;
use app_runner::manager::orchestrator::{Orchestrator, RunOutcome};

fn main() {
    logging::init();
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            println!("{}", e);
            process::exit(exit_codes::INVALID);
        }
    };

    let mut orchestrator = Orchestrator::new(config, cli.run_options());
    let code = match orchestrator.run(io::stdout()) {
        Ok(RunOutcome::Success) => exit_codes::OK,
        Ok(RunOutcome::SetupFailed) => {
            println!("Bailing on application setup since setup scripts failed.");
            exit_codes::SETUP_FAILED
        }
        Ok(RunOutcome::ApplicationsFailed { failed }) => {
            println!(
                "Bailing on writing Procfile. Error in application scripts: {}.",
                failed.join(", ")
            );
            exit_codes::APPLICATIONS_FAILED
        }
        Err(e) => {
            println!("{}", e);
            exit_codes::INVALID
        }
    };
    process::exit(code);
}
