//! The `artifex` command: incremental builds for C and C++ projects.
//!
//! Reads targets from `artifex.toml`, recompiles only the sources whose
//! inputs changed, and relinks when any object changed.

#![warn(missing_docs)]

mod build;
mod project;

use std::io::IsTerminal;
use std::process;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\n\nLicense ",
    env!("CARGO_PKG_LICENSE"),
    ".\nThis is free software: you are free to change and redistribute it.\n",
    "There is NO WARRANTY, to the extent permitted by law."
);

/// Incremental C/C++ builds without a Makefile.
#[derive(Parser, Debug)]
#[command(
    name = "artifex",
    version,
    long_version = LONG_VERSION,
    about = "Incremental C/C++ build tool",
    long_about = "Builds the targets in artifex.toml, recompiling only sources whose \
                  quoted includes or own content changed since the last build."
)]
pub struct Cli {
    /// Target to build. Builds every target in name order when omitted.
    pub target: Option<String>,

    /// Remove intermediates and outputs instead of building.
    #[arg(short, long, conflicts_with = "rebuild")]
    pub clean: bool,

    /// Clean, then build everything.
    #[arg(short, long)]
    pub rebuild: bool,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to an `artifex.toml` file or the directory containing it.
    #[arg(long)]
    pub config: Option<String>,

    /// Maximum number of concurrent compiles.
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Kill a compiler that runs longer than this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Stop starting new compiles once one has failed.
    #[arg(long)]
    pub fail_fast: bool,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config.clone(),
    };
    init_tracing(&global);

    match build::run(&cli, &global) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the level
/// chosen by `--verbose`.
fn init_tracing(global: &GlobalArgs) {
    let default = if global.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(global.color)
        .with_target(false)
        .without_time()
        .init();
}
