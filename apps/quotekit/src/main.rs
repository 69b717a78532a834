//! # QuoteKit CLI
//!
//! Entry point for the `quotekit` binary.

use std::process::ExitCode;

use clap::Parser;
use quotekit_app::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    quotekit_app::run(Cli::parse()).await
}
