//! # bagvet CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;

/// bagvet, a validation toolchain for BagIt bags.
///
/// Checks profile conformance, payload structure, checksum integrity,
/// and file-format conformance, and merges the outcomes into one
/// severity-ranked report.
#[derive(Parser, Debug)]
#[command(name = "bagvet", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate a bag and print the report.
    Validate(bagvet_cli::validate::ValidateArgs),
    /// List the bundled format plugins.
    Plugins(bagvet_cli::plugins::PluginsArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = match &cli.command {
        Commands::Validate(args) => bagvet_cli::validate::run_validate(args),
        Commands::Plugins(args) => bagvet_cli::plugins::run_plugins(args),
    };

    match outcome {
        Ok(code) => std::process::exit(code.into()),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(bagvet_cli::EXIT_ABORTED.into())
        }
    }
}
