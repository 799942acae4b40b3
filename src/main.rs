//! TIFF Intensity - command-line driver.
//!
//! Parses the CLI, sets up logging and runs one subcommand.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiff_intensity::{
    apply_all, codec,
    config::{ApplyConfig, Cli, Command, InfoConfig, MergeConfig},
    merge_planes, BlockReader, HistogramSummary, Photometric, RasterBuffer, TagStore, TiffTag,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Info(config) => run_info(config),
        Command::Apply(config) => run_apply(config),
        Command::Merge(config) => run_merge(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tiff_intensity=debug"
    } else {
        "tiff_intensity=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Info Command
// =============================================================================

/// Everything `info` reports about one file.
#[derive(Debug, Serialize)]
struct InfoReport {
    path: String,
    width: u32,
    length: u32,
    channels: u32,
    bit_depth: u32,
    photometric: Photometric,
    layout: LayoutReport,
    warnings: Vec<String>,
    histogram: Option<HistogramSummary>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LayoutReport {
    Strips { count: u32, rows_per_strip: u32 },
    Tiles { tile_width: u32, tile_length: u32 },
}

fn run_info(config: InfoConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let source = match codec::open(&config.input) {
        Ok(source) => source,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let layout = if source.is_tiled() {
        LayoutReport::Tiles {
            tile_width: source.get_tag(TiffTag::TileWidth).unwrap_or(0),
            tile_length: source.get_tag(TiffTag::TileLength).unwrap_or(0),
        }
    } else {
        LayoutReport::Strips {
            count: source.strip_count(),
            rows_per_strip: source.get_tag(TiffTag::RowsPerStrip).unwrap_or(0),
        }
    };
    let warnings = source.warnings().to_vec();

    let raster = match codec::decode_blocks(&source) {
        Ok(raster) => raster,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // Histograms are only meaningful for byte samples
    let histogram = (raster.bit_depth() == 8).then(|| raster.histogram().summary());

    let report = InfoReport {
        path: config.input.display().to_string(),
        width: raster.width(),
        length: raster.length(),
        channels: raster.channels(),
        bit_depth: raster.bit_depth(),
        photometric: raster.photometric(),
        layout,
        warnings,
        histogram,
    };

    if config.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_report(&report);
    }

    ExitCode::SUCCESS
}

fn print_report(report: &InfoReport) {
    println!("{}", report.path);
    println!("  Size:        {} x {}", report.width, report.length);
    println!(
        "  Format:      {} x {}-bit ({:?})",
        report.channels, report.bit_depth, report.photometric
    );
    match report.layout {
        LayoutReport::Strips {
            count,
            rows_per_strip,
        } => println!("  Layout:      {} strip(s), {} rows each", count, rows_per_strip),
        LayoutReport::Tiles {
            tile_width,
            tile_length,
        } => println!("  Layout:      {} x {} tiles", tile_width, tile_length),
    }
    for warning in &report.warnings {
        println!("  Warning:     {}", warning);
    }

    match &report.histogram {
        Some(summary) => {
            println!("  Samples:     {}", summary.samples);
            if let (Some(min), Some(max), Some(mean)) = (summary.min, summary.max, summary.mean) {
                println!("  Range:       {} - {}", min, max);
                println!("  Mean:        {:.2}", mean);
            }
            println!("  Levels used: {}", summary.occupied_bins);
        }
        None => println!("  Histogram:   unavailable for {}-bit samples", report.bit_depth),
    }
}

// =============================================================================
// Apply Command
// =============================================================================

fn run_apply(config: ApplyConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let transforms = config.transforms();
    let names: Vec<&str> = transforms.iter().map(|t| t.name()).collect();
    info!("Applying {} to {}", names.join(", "), config.input.display());

    let mut raster = match codec::decode(&config.input) {
        Ok(raster) => raster,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if raster.is_empty() {
        warn!("{} holds no pixels", config.input.display());
    }

    if let Err(e) = apply_all(&mut raster, &transforms) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    write_output(&raster, &config.output)
}

// =============================================================================
// Merge Command
// =============================================================================

fn run_merge(config: MergeConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let mut planes = Vec::with_capacity(3);
    for path in [&config.red, &config.green, &config.blue] {
        match codec::decode(path) {
            Ok(plane) => planes.push(plane),
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let raster = match merge_planes(&planes[0], &planes[1], &planes[2]) {
        Ok(raster) => raster,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Merged {} x {} planes", raster.width(), raster.length());
    write_output(&raster, &config.output)
}

fn write_output(raster: &RasterBuffer, output: &Path) -> ExitCode {
    if let Err(e) = codec::encode(raster, output) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    info!("Wrote {}", output.display());
    ExitCode::SUCCESS
}
