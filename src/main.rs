mod analysis;
mod auth;
mod cli;
mod config;
mod error;
mod model;
mod output;
mod providers;
mod summarize;
mod timeutil;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    output::print_banner();

    cli::load_dotenv();
    let cli = Cli::parse();
    info!("Starting ci-doctor");

    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", output::failure("Error:"));
            ExitCode::from(cli::exit_code(&err))
        }
    }
}
