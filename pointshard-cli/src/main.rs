//! Pointshard CLI - command-line interface
//!
//! This binary drives the pointshard library: scanning input point clouds
//! into per-source metadata records, and inspecting the per-depth node
//! address spans owned by a shard of the indexing domain.

mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pointshard")]
#[command(version = pointshard::VERSION)]
#[command(about = "Shard and scan point clouds for distributed indexing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze input point clouds and write per-source metadata records
    Scan {
        /// JSON scan configuration file; when given, the other flags are
        /// ignored
        #[arg(long)]
        config: Option<PathBuf>,

        /// Input files, directories, or metadata documents
        #[arg(long)]
        input: Vec<String>,

        /// Destination prefix for serialized source records
        #[arg(long)]
        output: Option<String>,

        /// Worker thread count
        #[arg(long, default_value_t = 8)]
        threads: usize,

        /// Input spatial reference for files that declare none
        #[arg(long)]
        srs_in: Option<String>,

        /// Output spatial reference to reproject into
        #[arg(long)]
        srs_out: Option<String>,

        /// Force the input SRS even when files declare their own
        #[arg(long)]
        hammer: bool,
    },

    /// Print the per-depth node-address spans owned by one shard
    Subset {
        /// Shard identifier, 0 <= id < of
        #[arg(long)]
        id: u64,

        /// Total shard count (a power of 4)
        #[arg(long)]
        of: u64,

        /// Domain bounds as minx,miny,minz,maxx,maxy,maxz
        #[arg(long)]
        bounds: String,

        /// Exclusive end of the depth range to print
        #[arg(long, default_value_t = 8)]
        depth_end: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = runner::run(cli.command) {
        e.exit();
    }
}
