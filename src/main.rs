//! Command-line entry point for openapi-from-python.
//!
//! ```bash
//! openapi-from-python -e project/urls.py -o openapi.json
//! openapi-from-python -e app/ -w flask -f yaml -o openapi.yaml --debug
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_python::cli;

fn main() -> Result<()> {
    // Parse once up front so `--debug` can configure the logger before validation logs
    let args = cli::CliArgs::parse();

    let log_level = if args.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("openapi-from-python starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
