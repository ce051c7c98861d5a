//! Configuration for the `region-decode` command line tool.
//!
//! Every option can be given on the command line or through an environment
//! variable with the `REGION_DECODE_` prefix:
//!
//! - `REGION_DECODE_PACKAGE` - Package name of the local context (default: com.example.viewer)
//! - `REGION_DECODE_RES_DIR` - Resource directory holding `drawable/`
//! - `REGION_DECODE_ASSETS_DIR` - Directory served for `file:///android_asset/` URIs
//! - `REGION_DECODE_CONTENT_ROOTS` - `authority=path` pairs for `content://` URIs
//! - `REGION_DECODE_PIXEL_FORMAT` - Process-wide default output pixel format
//! - `REGION_DECODE_DECODER` - Decoder kind to construct (default: raster)
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use region_decode::config::Cli;
//!
//! let cli = Cli::parse();
//! cli.validate()?;
//! let context = cli.source().build_context()?;
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::decoder::{PixelFormat, Rect, RasterBackend};
use crate::source::LocalContext;

// =============================================================================
// Default Values
// =============================================================================

/// Default package name of the local context.
pub const DEFAULT_PACKAGE: &str = "com.example.viewer";

/// Default decoder kind.
pub const DEFAULT_DECODER: &str = RasterBackend::NAME;

/// Default edge length of sweep tiles.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Default number of concurrent sweep decodes.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Largest accepted sample size.
pub const MAX_SAMPLE_SIZE: u32 = 1024;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Region Decode - inspect and decode images tile by tile.
#[derive(Parser, Debug, Clone)]
#[command(name = "region-decode")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Open a source with a region decoder and print its dimensions.
    Info(InfoConfig),

    /// Decode one region at a sample size and save it as an image file.
    Region(RegionConfig),

    /// Decode a whole image and save it as an image file.
    Decode(DecodeConfig),

    /// Decode every tile of a source concurrently and report timings.
    Sweep(SweepConfig),
}

/// Options shared by every subcommand: where sources come from and how
/// decoders are built.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Package name used for `android.resource://` URIs.
    #[arg(long, default_value = DEFAULT_PACKAGE, env = "REGION_DECODE_PACKAGE")]
    pub package: String,

    /// Resource directory of the package (expects a `drawable/` child).
    #[arg(long, env = "REGION_DECODE_RES_DIR")]
    pub res_dir: Option<PathBuf>,

    /// Directory served for `file:///android_asset/` URIs.
    #[arg(long, env = "REGION_DECODE_ASSETS_DIR")]
    pub assets_dir: Option<PathBuf>,

    /// Content providers as `authority=path` pairs (comma-separated).
    #[arg(long, env = "REGION_DECODE_CONTENT_ROOTS", value_delimiter = ',')]
    pub content_roots: Vec<String>,

    /// Default output pixel format (565, 8888, ARGB_4444, ALPHA_8).
    #[arg(long, env = "REGION_DECODE_PIXEL_FORMAT")]
    pub pixel_format: Option<PixelFormat>,

    /// Decoder kind to construct.
    #[arg(long, default_value = DEFAULT_DECODER, env = "REGION_DECODE_DECODER")]
    pub decoder: String,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Options for `info`.
#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// Source URI.
    pub uri: String,

    /// Print the result as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Options for `region`.
#[derive(Args, Debug, Clone)]
pub struct RegionConfig {
    /// Source URI.
    pub uri: String,

    /// Region in source pixels as `left,top,right,bottom`.
    #[arg(long)]
    pub rect: Rect,

    /// Downsampling factor.
    #[arg(short, long, default_value_t = 1)]
    pub sample_size: u32,

    /// Output file; the format follows the extension.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Decode regions one at a time even if the backend allows sharing.
    #[arg(long, default_value_t = false)]
    pub serialized: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Options for `decode`.
#[derive(Args, Debug, Clone)]
pub struct DecodeConfig {
    /// Source URI.
    pub uri: String,

    /// Output file; the format follows the extension.
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Options for `sweep`.
#[derive(Args, Debug, Clone)]
pub struct SweepConfig {
    /// Source URI.
    pub uri: String,

    /// Edge length of each tile in source pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    pub tile_size: u32,

    /// Downsampling factor.
    #[arg(short, long, default_value_t = 1)]
    pub sample_size: u32,

    /// Maximum number of tiles decoded at once.
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Decode regions one at a time even if the backend allows sharing.
    #[arg(long, default_value_t = false)]
    pub serialized: bool,

    /// Print the summary as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

// =============================================================================
// Validation
// =============================================================================

impl Cli {
    /// Shared source options of whichever subcommand was given.
    pub fn source(&self) -> &SourceArgs {
        match &self.command {
            Command::Info(config) => &config.source,
            Command::Region(config) => &config.source,
            Command::Decode(config) => &config.source,
            Command::Sweep(config) => &config.source,
        }
    }

    /// Validate the selected subcommand and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.source().validate()?;
        match &self.command {
            Command::Info(config) => validate_uri(&config.uri),
            Command::Region(config) => config.validate(),
            Command::Decode(config) => validate_uri(&config.uri),
            Command::Sweep(config) => config.validate(),
        }
    }
}

impl SourceArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.package.trim().is_empty() {
            return Err("package name is required. Set --package or REGION_DECODE_PACKAGE".to_string());
        }
        if self.decoder.trim().is_empty() {
            return Err("decoder kind must not be empty".to_string());
        }
        self.parse_content_roots()?;
        Ok(())
    }

    /// Parse `authority=path` pairs.
    pub fn parse_content_roots(&self) -> Result<Vec<(String, PathBuf)>, String> {
        self.content_roots
            .iter()
            .map(|entry| match entry.split_once('=') {
                Some((authority, path)) if !authority.is_empty() && !path.is_empty() => {
                    Ok((authority.to_string(), PathBuf::from(path)))
                }
                _ => Err(format!(
                    "invalid content root '{}': expected authority=path",
                    entry
                )),
            })
            .collect()
    }

    /// Build the local source context these options describe.
    pub fn build_context(&self) -> Result<LocalContext, String> {
        let mut context = LocalContext::new(self.package.clone());

        if let Some(ref res_dir) = self.res_dir {
            context = context
                .with_resources(res_dir)
                .map_err(|e| format!("failed to load resources: {}", e))?;
        }
        if let Some(ref assets_dir) = self.assets_dir {
            context = context.with_assets(assets_dir.clone());
        }
        for (authority, root) in self.parse_content_roots()? {
            context = context.with_content_root(authority, root);
        }

        Ok(context)
    }
}

impl RegionConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_uri(&self.uri)?;
        validate_sample_size(self.sample_size)?;
        if self.rect.is_empty() {
            return Err(format!("rect {:?} is empty", self.rect));
        }
        validate_serialized(self.serialized, &self.source)
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_uri(&self.uri)?;
        validate_sample_size(self.sample_size)?;
        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }
        validate_serialized(self.serialized, &self.source)
    }
}

fn validate_uri(uri: &str) -> Result<(), String> {
    if uri.trim().is_empty() {
        return Err("source URI is required".to_string());
    }
    Ok(())
}

/// `--serialized` only applies to the built-in raster decoder.
fn validate_serialized(serialized: bool, source: &SourceArgs) -> Result<(), String> {
    if serialized && source.decoder != DEFAULT_DECODER {
        return Err(format!(
            "--serialized is only supported with the '{}' decoder, not '{}'",
            DEFAULT_DECODER, source.decoder
        ));
    }
    Ok(())
}

fn validate_sample_size(sample_size: u32) -> Result<(), String> {
    if sample_size == 0 || sample_size > MAX_SAMPLE_SIZE {
        return Err(format!(
            "sample_size must be between 1 and {}",
            MAX_SAMPLE_SIZE
        ));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
