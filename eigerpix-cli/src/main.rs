//! eigerpix command-line interface.
//!
//! Identifies ID7B2 EIGER files and inspects their repaired metadata and
//! per-module pixel data.
#![allow(clippy::uninlined_format_args)]

use clap::{Parser, Subcommand};
use eigerpix_core::{
    DetectorDescriptor, DetectorProfile, EigerProfile, FrameOrder, ModuleSlice, ProfileConfig,
    INACTIVE_PIXEL, SATURATED_PIXEL,
};
use eigerpix_io::{EigerImageFormat, FormatRegistry, ModuleArray};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    EigerpixIo(#[from] eigerpix_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] eigerpix_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}: not recognised by any registered format")]
    Unrecognized(PathBuf),
}

/// Inspect NXmx files from the ID7B2 EIGER detector.
#[derive(Parser)]
#[command(name = "eigerpix")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Profile configuration (JSON); defaults to the built-in ID7B2 profile
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which format plugin recognises each file
    Identify {
        /// Input file(s)
        #[arg(required = true)]
        input: Vec<PathBuf>,
    },

    /// Show repaired detector metadata and dataset layout
    Info {
        /// Input master file
        input: PathBuf,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarise the per-module pixel data of one image
    Frame {
        /// Input master file
        input: PathBuf,

        /// Zero-based image index
        #[arg(short, long, default_value = "0")]
        index: usize,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct InfoReport {
    file: PathBuf,
    plugin: String,
    detector: DetectorDescriptor,
    effective_bit_depth: Option<u32>,
    block_keys: Vec<String>,
    frames_per_block: usize,
    frame_order: FrameOrder,
    image_count: usize,
    rotation_axis: [f64; 3],
}

#[derive(Serialize)]
struct ModuleReport {
    name: String,
    region: ModuleSlice,
    shape: [usize; 2],
    min: Option<i64>,
    max: Option<i64>,
    inactive: usize,
    saturated: usize,
}

impl ModuleReport {
    fn new(name: &str, region: ModuleSlice, array: &ModuleArray) -> Self {
        Self {
            name: name.to_string(),
            shape: [array.nrows(), array.ncols()],
            region,
            min: array.iter().copied().min(),
            max: array.iter().copied().max(),
            inactive: array.iter().filter(|&&v| v == INACTIVE_PIXEL).count(),
            saturated: array.iter().filter(|&&v| v == SATURATED_PIXEL).count(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn registry(config: Option<&Path>) -> Result<FormatRegistry> {
    match config {
        Some(path) => {
            let profile = EigerProfile::with_config(ProfileConfig::from_file(path)?)?;
            log::debug!("using profile {} from {}", profile.name(), path.display());
            let mut registry = FormatRegistry::new();
            registry.register(Arc::new(profile))?;
            Ok(registry)
        }
        None => Ok(FormatRegistry::with_builtin()),
    }
}

fn open(registry: &FormatRegistry, path: &Path) -> Result<EigerImageFormat> {
    registry
        .open(path)?
        .ok_or_else(|| CliError::Unrecognized(path.to_path_buf()))
}

fn run(cli: Cli) -> Result<()> {
    let registry = registry(cli.config.as_deref())?;

    match cli.command {
        Commands::Identify { input } => {
            for path in &input {
                match registry.find(path) {
                    Some(profile) => println!("{}: {}", path.display(), profile.name()),
                    None => println!("{}: unrecognized", path.display()),
                }
            }
        }

        Commands::Info { input, json } => {
            let format = open(&registry, &input)?;
            let detector = format.detector()?;
            let layout = format.layout()?;

            let report = InfoReport {
                file: input,
                plugin: format.profile_name().to_string(),
                effective_bit_depth: detector.effective_bit_depth(),
                detector,
                block_keys: layout.block_keys().to_vec(),
                frames_per_block: layout.frames_per_block(),
                frame_order: layout.order(),
                image_count: layout.image_count(),
                rotation_axis: format.goniometer().rotation_axis,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_info(&report);
            }
        }

        Commands::Frame { input, index, json } => {
            let format = open(&registry, &input)?;
            let detector = format.detector()?;
            let modules = format.get_raw_data(index)?;

            let reports: Vec<ModuleReport> = detector
                .modules
                .iter()
                .zip(&modules)
                .map(|(module, array)| ModuleReport::new(&module.name, module.slice(), array))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                println!("Image {} of {}", index, input.display());
                println!(
                    "{:<12} | {:<14} | {:>12} | {:>12} | {:>8} | {:>9}",
                    "Module", "Shape", "Min", "Max", "Inactive", "Saturated"
                );
                println!("{:-<82}", "");
                for report in &reports {
                    println!(
                        "{:<12} | {:<14} | {:>12} | {:>12} | {:>8} | {:>9}",
                        report.name,
                        format!("{}x{}", report.shape[0], report.shape[1]),
                        report.min.map_or_else(|| "-".to_string(), |v| v.to_string()),
                        report.max.map_or_else(|| "-".to_string(), |v| v.to_string()),
                        report.inactive,
                        report.saturated
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_info(report: &InfoReport) {
    let detector = &report.detector;
    println!("File: {}", report.file.display());
    println!("Plugin: {}", report.plugin);
    println!("Detector: {}", detector.detector_number_lossy());
    println!(
        "Firmware: {}",
        detector.firmware_version.as_deref().unwrap_or("-")
    );
    println!(
        "Bit depth: image {:?}, readout {:?}, effective {:?}",
        detector.bit_depth_image, detector.bit_depth_readout, report.effective_bit_depth
    );
    println!(
        "Underload: {:?}, saturation: {:?}",
        detector.underload_value, detector.saturation_value
    );
    println!(
        "nimages: {}, ntrigger: {}",
        detector.nimages, detector.ntrigger
    );
    println!("Modules: {}", detector.modules.len());
    for module in &detector.modules {
        println!(
            "  {:<12} origin {:?} size {:?}",
            module.name, module.data_origin, module.data_size
        );
    }
    println!(
        "Data blocks: {} x {} frames ({})",
        report.block_keys.len(),
        report.frames_per_block,
        report.block_keys.join(", ")
    );
    println!("Images: {} ({:?} order)", report.image_count, report.frame_order);
    println!("Rotation axis: {:?}", report.rotation_axis);
}
