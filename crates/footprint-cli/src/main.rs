//! Footprint CLI: the `footprint` command.

mod cli;
mod commands;
mod job;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Allocate {
            job,
            config,
            epsilon,
            working_crs,
            layer_name_from,
            no_sort,
            priority,
            csv,
            json,
        } => commands::allocate::run(commands::allocate::Args {
            job,
            config,
            epsilon,
            working_crs,
            layer_name_from,
            no_sort,
            priority,
            csv,
            json,
        }),

        Commands::Crs { id, json } => commands::crs::run(id, json),
    }
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("FOOTPRINT_LOG").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("footprint_kernel=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
