mod command_info;
mod command_list;
mod command_merge;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{
    io::{stderr, stdout, Write},
    path::PathBuf,
};
use tracing_subscriber::EnvFilter;

use pcapmerge::config::get_default_content;

/// Tool for merging pcap capture files.
///
/// Captures are merged in the order of the timestamp of their first packet. All captures are
/// expected to share the same link-layer type, snapshot length, and byte order; the merged
/// capture uses the file header of the earliest capture.
///
/// Repository: <https://github.com/bmflynn/pcapmerge>
#[derive(Parser)]
#[command(version, about, long_about, disable_help_subcommand = true)]
struct Cli {
    /// Logging level filters, e.g., debug, info, warn, etc ...
    #[arg(short, long, default_value = "info")]
    logging: String,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge all capture files in a directory into a single capture.
    ///
    /// Only files directly in the directory are considered. Files that are not usable captures
    /// are skipped. If the merge fails the output is removed.
    Merge {
        /// YAML configuration file to use, rather than the embedded default config. See the
        /// config subcommand to view the embedded configuration.
        #[arg(short, long, value_name = "path")]
        config: Option<PathBuf>,

        /// Directory containing captures to merge.
        #[arg(value_name = "directory")]
        input: PathBuf,

        /// Merged capture file; overwritten if it exists.
        #[arg(value_name = "filename")]
        output: PathBuf,
    },
    /// List the captures that would be merged, in merge order, as JSON.
    List {
        /// YAML configuration file to use, rather than the embedded default config.
        #[arg(short, long, value_name = "path")]
        config: Option<PathBuf>,

        #[arg(value_name = "directory")]
        input: PathBuf,
    },
    /// Generate JSON containing the file header and first packet header of a capture.
    Info {
        #[arg(value_name = "path")]
        input: PathBuf,
    },
    /// Output the default configuration.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(EnvFilter::new(cli.logging))
        .init();

    match cli.commands {
        Commands::Merge {
            config,
            input,
            output,
        } => {
            crate::command_merge::merge(config, &input, &output)?;
        }
        Commands::List { config, input } => {
            crate::command_list::list(config, &input)?;
        }
        Commands::Info { input } => {
            crate::command_info::info(input)?;
        }
        Commands::Config => {
            stdout().write_all(get_default_content().as_bytes())?;
        }
    }

    Ok(())
}
