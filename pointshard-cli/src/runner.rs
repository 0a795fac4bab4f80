//! Command execution.

use crate::error::CliError;
use crate::Command;
use pointshard::config::ScanConfig;
use pointshard::engine::TextEngine;
use pointshard::geom::Bounds;
use pointshard::logging::{default_log_dir, default_log_file, init_logging};
use pointshard::pipeline::Reprojection;
use pointshard::scan::{scan, serialize};
use pointshard::storage::{Endpoint, FsStorage};
use pointshard::subset::Subset;
use std::path::PathBuf;
use std::sync::Arc;

/// Run a parsed command to completion.
pub fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Scan {
            config,
            input,
            output,
            threads,
            srs_in,
            srs_out,
            hammer,
        } => run_scan(config, input, output, threads, srs_in, srs_out, hammer),
        Command::Subset {
            id,
            of,
            bounds,
            depth_end,
        } => run_subset(id, of, &bounds, depth_end),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_scan(
    config: Option<PathBuf>,
    input: Vec<String>,
    output: Option<String>,
    threads: usize,
    srs_in: Option<String>,
    srs_out: Option<String>,
    hammer: bool,
) -> Result<(), CliError> {
    let _guard = init_logging(default_log_dir(), default_log_file())
        .map_err(|e| CliError::Logging(e.to_string()))?;

    let scan_config = match config {
        Some(path) => ScanConfig::load(&path).map_err(|e| CliError::Config(e.to_string()))?,
        None => {
            if input.is_empty() {
                return Err(CliError::Config(
                    "either --config or --input is required".to_string(),
                ));
            }
            let mut config = ScanConfig::for_inputs(input);
            config.threads = threads;
            config.output = output;
            config.reprojection =
                srs_out.map(|out| Reprojection::new(srs_in.unwrap_or_default(), out, hammer));
            config
        }
    };

    let storage = Arc::new(FsStorage::new());
    let sources = scan(&scan_config, Arc::new(TextEngine::new()), storage.clone())
        .map_err(|e| CliError::Scan(e.to_string()))?;

    let failed = sources.iter().filter(|s| s.failed()).count();
    println!("Analyzed {} sources ({} failed)", sources.len(), failed);
    for source in sources.iter().filter(|s| s.failed()) {
        println!("  {}: {}", source.path, source.info.errors.join("; "));
    }

    if let Some(output) = &scan_config.output {
        let endpoint = Endpoint::new(storage, output.clone());
        serialize(&sources, &endpoint, scan_config.threads);
        println!("Wrote {} records to {}", sources.len(), output);
    }

    Ok(())
}

fn run_subset(id: u64, of: u64, bounds: &str, depth_end: u32) -> Result<(), CliError> {
    let bounds = parse_bounds(bounds)?;

    let subset = Subset::new(bounds, id, of).map_err(|e| CliError::Subset(e.to_string()))?;
    let spans = subset
        .calc_spans(depth_end)
        .map_err(|e| CliError::Subset(e.to_string()))?;

    println!("Shard {} of {}", subset.id(), subset.of());
    println!("  volume: {}", subset.bounds());
    println!("  first split depth: {}", subset.minimum_null_depth());

    for (depth, list) in spans.iter().enumerate() {
        if list.is_empty() {
            println!("  depth {:>2}: (shared)", depth);
            continue;
        }
        let ranges: Vec<String> = list
            .iter()
            .map(|s| format!("[{}, {})", s.begin(), s.end()))
            .collect();
        let nodes: u64 = list.iter().map(|s| s.count()).sum();
        println!("  depth {:>2}: {} - {} nodes", depth, ranges.join(" "), nodes);
    }

    Ok(())
}

fn parse_bounds(raw: &str) -> Result<Bounds, CliError> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|token| token.trim().parse())
        .collect::<Result<_, _>>()
        .map_err(|_| CliError::InvalidBounds(raw.to_string()))?;

    if values.len() != 6 {
        return Err(CliError::InvalidBounds(raw.to_string()));
    }

    Ok(Bounds::new(
        values[0], values[1], values[2], values[3], values[4], values[5],
    ))
}
