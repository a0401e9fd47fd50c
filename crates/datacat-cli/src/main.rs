//! datacat command-line client
//!
//! Opens a catalog directory, runs one command against it and prints the
//! result as a table or JSON.

mod commands;
mod config;
mod error;
mod formatter;

use clap::Parser;
use datacat_core::CatalogService;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Args;
use error::CliError;

fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "datacat=info,datacat_core=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let (config, command) = args.into_config()?;

    info!(path = %config.data_path.display(), "Opening catalog");
    let service =
        CatalogService::open(config.storage_config())?.with_priority_list(config.priority.clone());

    let formatter = formatter::create_formatter(config.format);
    let output = commands::execute(&service, &config, command, formatter.as_ref())?;
    println!("{}", output);

    Ok(())
}
