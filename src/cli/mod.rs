//! Command line entry points

pub mod serve;

use clap::{Parser, Subcommand};

/// Shared cache and admission-control layer for read-heavy HTTP APIs
#[derive(Parser)]
#[command(name = "edgestate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(serve::ServeArgs),
}
