//! dds-eval CLI - DDS encoder comparison tool

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dds_eval::ReleaseTool;

mod commands;
mod logging;

/// Compare BC7 DDS encoders and prepare texture inputs.
#[derive(Parser)]
#[command(name = "dds-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run encoders over a directory of PNG files and print CSV tables
    Compare {
        /// Directory of PNG input files
        input: PathBuf,

        /// Directory receiving one subdirectory per encoder
        output: PathBuf,

        /// Use bc7enc
        #[arg(long)]
        bc7enc: bool,

        /// Use NVIDIA Texture Tools (nvbatchcompress)
        #[arg(long)]
        nvtt: bool,

        /// Use png2dds
        #[arg(long)]
        png2dds: bool,

        /// Use texconv
        #[arg(long)]
        texconv: bool,

        /// Print CPU, GPU and tool versions
        #[arg(long)]
        info: bool,

        /// Time a whole-directory conversion per encoder
        #[arg(long)]
        batch: bool,

        /// Time each file separately and record output sizes
        #[arg(long)]
        files: bool,

        /// Compute FLIP, PSNR, RMSE and SSIM for existing encoder output
        #[arg(long)]
        metrics: bool,

        /// Limit concurrent encoder processes in batch mode
        #[arg(long, value_name = "N")]
        max_processes: Option<NonZeroUsize>,

        /// Fail when an encoder exits with a non-zero status
        #[arg(long)]
        check_exit_codes: bool,
    },

    /// Copy every PNG in a directory tree into a single folder
    Flatten {
        /// Root of the tree to collect from
        input: PathBuf,

        /// Destination folder
        output: PathBuf,
    },

    /// Download a prebuilt tool from its latest GitHub release
    Fetch {
        /// Tool to download (ispc or ninja)
        tool: ReleaseTool,

        /// Directory to install into
        #[arg(long, default_value = ".")]
        dest: PathBuf,

        /// GitHub token for authenticated API requests
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Errors are reported on a single line, causes joined with `: `.
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Compare {
            input,
            output,
            bc7enc,
            nvtt,
            png2dds,
            texconv,
            info,
            batch,
            files,
            metrics,
            max_processes,
            check_exit_codes,
        } => commands::compare::run(commands::compare::Args {
            input,
            output,
            bc7enc,
            nvtt,
            png2dds,
            texconv,
            info,
            batch,
            files,
            metrics,
            max_processes,
            check_exit_codes,
        }),
        Commands::Flatten { input, output } => commands::flatten::run(input, output),
        Commands::Fetch { tool, dest, token } => commands::fetch::run(tool, dest, token),
    }
}
