//! Data quality checks for relational databases.
//!
//! This binary profiles tables, infers and tests expectation suites and
//! flags statistical outliers. It only ever reads from the database.
//!
//! # Exit codes
//! - `0`: command finished (for `test`: at least 90% of expectations met)
//! - `1`: configuration or runtime error, or `test` below the pass threshold

use clap::Parser;
use dbquality::{Cli, execute};
use dbquality_core::logging::init_logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match execute(cli).await {
        Ok(status) => status.exit_code(),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
