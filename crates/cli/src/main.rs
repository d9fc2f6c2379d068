//! CLI for ingesting presentation uploads.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deck_core::Config;
use deck_raster::{ImageCache, RasterPipeline, RasterWorkerPool, ToolConfig};
use deck_storage::{Reconciler, StaticReferences, StorageProbe, DEFAULT_TTL};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// Parse, rasterize and reconcile uploaded presentations.
#[derive(Parser, Debug)]
#[command(name = "deck-ingest")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract ordered slide titles, bodies and notes as JSON
    Parse {
        /// Input .pptx file
        file: PathBuf,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Render a deck to cached slide images
    Rasterize {
        /// Input .pptx file
        file: PathBuf,

        /// Owner id the images are stored under
        #[arg(short, long)]
        owner: String,

        /// Number of raster worker threads
        #[arg(short, long, default_value = "1")]
        workers: usize,

        /// Per-stage timeout in seconds
        #[arg(long, default_value = "120")]
        timeout: u64,
    },

    /// Report cached slide images for an owner
    Images {
        /// Owner id
        owner: String,

        /// 0-based slide index to check
        #[arg(short, long)]
        index: Option<usize>,
    },

    /// Check that the storage mount is writable
    Probe,

    /// Wipe the image cache and delete unreferenced stored files
    Reconcile {
        /// File listing referenced presentation paths, one per line
        #[arg(long)]
        presentations: PathBuf,

        /// File listing referenced narration paths, one per line
        #[arg(long)]
        narration: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let config = Config::from_env();

    match args.command {
        Command::Parse { file, pretty } => parse(&file, pretty),
        Command::Rasterize {
            file,
            owner,
            workers,
            timeout,
        } => rasterize(&config, &file, &owner, workers, Duration::from_secs(timeout)),
        Command::Images { owner, index } => images(&config, &owner, index),
        Command::Probe => probe(&config),
        Command::Reconcile {
            presentations,
            narration,
        } => reconcile(&config, &presentations, &narration),
    }
}

fn parse(file: &Path, pretty: bool) -> Result<ExitCode> {
    let bytes = read_input(file)?;
    log::debug!("Parsing {} ({} bytes)", file.display(), bytes.len());

    let outcome = deck_pptx::parse_presentation(&bytes);
    print_json(&serde_json::to_value(&outcome)?, pretty)?;

    Ok(if outcome.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn rasterize(
    config: &Config,
    file: &Path,
    owner: &str,
    workers: usize,
    timeout: Duration,
) -> Result<ExitCode> {
    StorageProbe::new(&config.storage_root, DEFAULT_TTL).check()?;

    let bytes = read_input(file)?;
    let tools = ToolConfig::from_config(config).with_timeout(timeout);
    let pipeline = RasterPipeline::new(tools, ImageCache::from_layout(&config.layout()));
    let pool = RasterWorkerPool::new(pipeline, workers, workers.max(1))?;

    let result = pool.submit(owner, bytes)?.wait();
    print_json(&serde_json::to_value(&result)?, false)?;

    Ok(match result.count() {
        Some(_) => ExitCode::SUCCESS,
        None => ExitCode::FAILURE,
    })
}

fn images(config: &Config, owner: &str, index: Option<usize>) -> Result<ExitCode> {
    let cache = ImageCache::from_layout(&config.layout());

    let output = match index {
        Some(index) => json!({
            "owner": owner,
            "index": index,
            "exists": cache.exists(owner, index),
            "path": cache.image_path(owner, index)?.display().to_string(),
        }),
        None => json!({
            "owner": owner,
            "count": cache.count(owner)?,
        }),
    };
    print_json(&output, false)?;
    Ok(ExitCode::SUCCESS)
}

fn probe(config: &Config) -> Result<ExitCode> {
    let probe = StorageProbe::new(&config.storage_root, DEFAULT_TTL);
    let path = probe.root().display().to_string();

    let output = match probe.recheck() {
        Ok(()) => json!({ "path": path, "writable": true }),
        Err(e) => json!({ "path": path, "writable": false, "reason": e.to_string() }),
    };
    print_json(&output, false)?;

    Ok(if output["writable"] == true {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn reconcile(config: &Config, presentations: &Path, narration: &Path) -> Result<ExitCode> {
    let references = StaticReferences::new(read_list(presentations)?, read_list(narration)?);
    let report = Reconciler::new(config.layout()).sweep(&references)?;
    print_json(&serde_json::to_value(&report)?, false)?;

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Non-empty, non-comment lines of a reference list.
fn read_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read reference list {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}
