//! sketchsync CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "sketchsync")]
#[command(version)]
#[command(about = "Preprocess, check and refactor sketches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that loads a sketch.
#[derive(Debug, Args)]
pub struct SketchArgs {
    /// Sketch tabs, in tab order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// TOML config file with [service] and [checker] tables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the generated class (defaults to the first tab's name)
    #[arg(long)]
    name: Option<String>,

    /// Directory of library class catalogs
    #[arg(long)]
    libraries: Option<PathBuf>,

    /// Directory of code-folder class catalogs
    #[arg(long)]
    code_folder: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report problems in a sketch
    Check {
        #[command(flatten)]
        sketch: SketchArgs,

        /// Also report warnings
        #[arg(long)]
        warnings: bool,

        /// Do not suggest imports for unknown types
        #[arg(long)]
        no_import_suggestions: bool,

        /// Print problems as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the Java code derived from a sketch
    Derive {
        #[command(flatten)]
        sketch: SketchArgs,
    },

    /// List every occurrence of the name at a position
    Usages {
        #[command(flatten)]
        sketch: SketchArgs,

        /// 0-based tab index
        #[arg(long)]
        file: usize,

        /// Byte offset inside the tab
        #[arg(long)]
        offset: usize,

        /// Print usages as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rename the declaration at a position
    Rename {
        #[command(flatten)]
        sketch: SketchArgs,

        /// 0-based tab index
        #[arg(long)]
        file: usize,

        /// Byte offset inside the tab
        #[arg(long)]
        offset: usize,

        /// New name
        #[arg(long)]
        to: String,

        /// Rewrite the tabs in place instead of printing them
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            sketch,
            warnings,
            no_import_suggestions,
            json,
        } => {
            let has_errors = commands::check::execute(commands::check::CheckArgs {
                sketch,
                warnings,
                import_suggestions: !no_import_suggestions,
                json,
            })?;
            if has_errors {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Derive { sketch } => commands::derive::execute(&sketch),
        Commands::Usages {
            sketch,
            file,
            offset,
            json,
        } => commands::usages::execute(&sketch, file, offset, json),
        Commands::Rename {
            sketch,
            file,
            offset,
            to,
            write,
        } => commands::rename::execute(&sketch, file, offset, &to, write),
    }
}
