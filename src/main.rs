//! GenoReport Worker main executable

pub mod ancestry;
pub mod common;
pub mod genotype;
pub mod pgx;
pub mod prs;

use clap::{Args, Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "GenoReport heavy lifting",
    long_about = "This tool performs the heavy lifting for genoreport-server"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Subcommand)]
enum Commands {
    /// Ancestry related commands.
    Ancestry(Ancestry),
    /// Pharmacogenomics related commands.
    Pgx(Pgx),
    /// Polygenic score related commands.
    Prs(Prs),
}

/// Parsing of "ancestry *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Ancestry {
    /// The sub command to run
    #[command(subcommand)]
    command: AncestryCommands,
}

/// Enum supporting the parsing of "ancestry *" sub commands.
#[derive(Debug, Subcommand)]
enum AncestryCommands {
    Infer(ancestry::infer::Args),
}

/// Parsing of "pgx *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Pgx {
    /// The sub command to run
    #[command(subcommand)]
    command: PgxCommands,
}

/// Enum supporting the parsing of "pgx *" sub commands.
#[derive(Debug, Subcommand)]
enum PgxCommands {
    Call(pgx::call::Args),
}

/// Parsing of "prs *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Prs {
    /// The sub command to run
    #[command(subcommand)]
    command: PrsCommands,
}

/// Enum supporting the parsing of "prs *" sub commands.
#[derive(Debug, Subcommand)]
enum PrsCommands {
    Score(prs::score::Args),
    Compare(prs::compare::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Ancestry(ancestry) => match &ancestry.command {
                AncestryCommands::Infer(args) => {
                    ancestry::infer::run(&cli.common, args)?;
                }
            },
            Commands::Pgx(pgx) => match &pgx.command {
                PgxCommands::Call(args) => {
                    pgx::call::run(&cli.common, args)?;
                }
            },
            Commands::Prs(prs) => match &prs.command {
                PrsCommands::Score(args) => {
                    prs::score::run(&cli.common, args)?;
                }
                PrsCommands::Compare(args) => {
                    prs::compare::run(&cli.common, args)?;
                }
            },
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}
