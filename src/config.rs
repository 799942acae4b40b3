//! Command-line configuration for tiff-intensity.
//!
//! Subcommands:
//! - `info` - print geometry, layout and a histogram summary
//! - `apply` - decode, run intensity transforms, encode
//! - `merge` - combine three single-channel planes into one RGB image
//!
//! # Environment Variables
//!
//! - `TIFF_INTENSITY_VERBOSE` - Enable debug logging
//! - `TIFF_INTENSITY_JSON` - Print `info` output as JSON
//! - `TIFF_INTENSITY_FORCE` - Allow overwriting existing output files
//!
//! `RUST_LOG` overrides the log filter entirely.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};

use crate::transform::{CurveSegment, Transform};

// =============================================================================
// CLI Arguments
// =============================================================================

/// TIFF Intensity - pointwise intensity transforms for TIFF images.
#[derive(Parser, Debug, Clone)]
#[command(name = "tiff-intensity")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, env = "TIFF_INTENSITY_VERBOSE")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print image geometry, block layout and a histogram summary.
    Info(InfoConfig),

    /// Apply intensity transforms and write the result.
    ///
    /// Transforms run in a fixed order: negate, threshold, gamma, curves,
    /// equalize.
    Apply(ApplyConfig),

    /// Merge red, green and blue planes into one RGB image.
    Merge(MergeConfig),
}

// =============================================================================
// Info
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// TIFF file to inspect.
    pub input: PathBuf,

    /// Print a JSON document instead of text.
    #[arg(long, env = "TIFF_INTENSITY_JSON")]
    pub json: bool,
}

impl InfoConfig {
    pub fn validate(&self) -> Result<(), String> {
        check_input(&self.input)
    }
}

// =============================================================================
// Apply
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ApplyConfig {
    /// TIFF file to read.
    pub input: PathBuf,

    /// Where to write the transformed image.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Replace every value x with 255 - x.
    #[arg(long)]
    pub negate: bool,

    /// Threshold as LOWER or LOWER:UPPER.
    ///
    /// Values below LOWER become 0, values at or above UPPER become 255.
    /// A single value is a binary threshold.
    #[arg(long, value_name = "LOWER[:UPPER]")]
    pub threshold: Option<ThresholdRange>,

    /// Gamma correction factor (> 0).
    #[arg(long)]
    pub gamma: Option<f64>,

    /// Curve segment as begin_x,begin_y,end_x,end_y. Repeat for more
    /// segments; later segments win where they overlap.
    #[arg(long = "curve", value_name = "BX,BY,EX,EY")]
    pub curves: Vec<CurveSegment>,

    /// Histogram-equalize the result.
    #[arg(long)]
    pub equalize: bool,

    /// Overwrite the output file if it exists.
    #[arg(short, long, env = "TIFF_INTENSITY_FORCE")]
    pub force: bool,
}

impl ApplyConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        check_input(&self.input)?;
        check_output(&self.output, self.force)?;

        if self.input == self.output {
            return Err("Output must differ from the input file".to_string());
        }

        let transforms = self.transforms();
        if transforms.is_empty() {
            return Err(
                "No transforms requested. Use --negate, --threshold, --gamma, --curve or --equalize"
                    .to_string(),
            );
        }
        for transform in &transforms {
            transform.validate().map_err(|e| e.to_string())?;
        }

        Ok(())
    }

    /// The requested transforms in application order.
    pub fn transforms(&self) -> Vec<Transform> {
        let mut transforms = Vec::new();
        if self.negate {
            transforms.push(Transform::Negate);
        }
        if let Some(range) = self.threshold {
            transforms.push(Transform::Threshold {
                lower: range.lower,
                upper: range.upper,
            });
        }
        if let Some(gamma) = self.gamma {
            transforms.push(Transform::Gamma(gamma));
        }
        if !self.curves.is_empty() {
            transforms.push(Transform::Curves(self.curves.clone()));
        }
        if self.equalize {
            transforms.push(Transform::Equalize);
        }
        transforms
    }
}

/// `--threshold` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdRange {
    pub lower: u8,
    pub upper: u8,
}

impl FromStr for ThresholdRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u8>()
                .map_err(|e| format!("invalid threshold '{}': {}", part.trim(), e))
        };

        match s.split_once(':') {
            Some((lower, upper)) => Ok(Self {
                lower: parse(lower)?,
                upper: parse(upper)?,
            }),
            None => {
                let value = parse(s)?;
                Ok(Self {
                    lower: value,
                    upper: value,
                })
            }
        }
    }
}

impl fmt::Display for ThresholdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lower == self.upper {
            write!(f, "{}", self.lower)
        } else {
            write!(f, "{}:{}", self.lower, self.upper)
        }
    }
}

// =============================================================================
// Merge
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct MergeConfig {
    /// Single-channel red plane.
    pub red: PathBuf,

    /// Single-channel green plane.
    pub green: PathBuf,

    /// Single-channel blue plane.
    pub blue: PathBuf,

    /// Where to write the RGB image.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Overwrite the output file if it exists.
    #[arg(short, long, env = "TIFF_INTENSITY_FORCE")]
    pub force: bool,
}

impl MergeConfig {
    pub fn validate(&self) -> Result<(), String> {
        for input in [&self.red, &self.green, &self.blue] {
            check_input(input)?;
            if *input == self.output {
                return Err(format!(
                    "Output {} is also an input plane",
                    self.output.display()
                ));
            }
        }
        check_output(&self.output, self.force)
    }
}

fn check_input(path: &Path) -> Result<(), String> {
    if !path.is_file() {
        return Err(format!("Input {} is not a readable file", path.display()));
    }
    Ok(())
}

fn check_output(path: &Path, force: bool) -> Result<(), String> {
    if path.exists() && !force {
        return Err(format!(
            "Output {} already exists. Pass --force or set TIFF_INTENSITY_FORCE=true to overwrite",
            path.display()
        ));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
