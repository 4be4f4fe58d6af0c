//! Compile a Mini Triangle source file into a bytecode module.
//!
//! Usage: `minitri compile <source.mt> [--output FILE]`
//!
//! Exit codes: 0 on success, 1 on a source error, 2 on an internal
//! compiler error.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "minitri")]
#[command(about = "Compile Mini Triangle programs to bytecode modules")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a source file into a `.mtc` module
    Compile {
        /// Path to the Mini Triangle source file
        source: PathBuf,

        /// Explicit output file path (default: source path with `.mtc`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let Command::Compile { source, output } = cli.command;

    let text = match fs::read_to_string(&source) {
        Ok(text) => text,
        Err(err) => {
            error!("failed to read {}: {}", source.display(), err);
            process::exit(1);
        }
    };

    let bytes = match minitri_compiler::compile(&source, &text) {
        Ok(bytes) => bytes,
        Err(diagnostic) => {
            error!("{}", diagnostic);
            process::exit(if diagnostic.error.is_internal() { 2 } else { 1 });
        }
    };

    let output_path = output.unwrap_or_else(|| source.with_extension("mtc"));
    if let Err(err) = fs::write(&output_path, bytes) {
        error!("failed to write {}: {}", output_path.display(), err);
        process::exit(1);
    }

    info!("wrote module to {}", output_path.display());
}
