//! Region Decode - command line front end for the region decoding library.
//!
//! Each subcommand builds a decoder through a factory, binds it to one
//! source, uses it, and recycles it before exiting.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use region_decode::{
    config::{Cli, Command, DecodeConfig, InfoConfig, RegionConfig, SourceArgs, SweepConfig},
    decoder::{
        set_preferred_pixel_format, DecodedImage, ImageDecoder, ImageRegionDecoder, LockPolicy,
        RasterBackend, Rect, RegionDecoder, RegionDecoderConfig, SharedRegionDecoder,
    },
    factory::{BoundDecoderFactory, DecoderFactory, DecoderRegistry},
    source::LocalContext,
    DecoderError,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.source().verbose);

    if let Err(e) = cli.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    if let Some(format) = cli.source().pixel_format {
        if set_preferred_pixel_format(format).is_err() {
            warn!(pixel_format = %format, "Preferred pixel format was already set");
        }
    }

    let context = match cli.source().build_context() {
        Ok(context) => context,
        Err(e) => {
            error!("Failed to set up sources: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Info(config) => run_info(&context, config).await,
        Command::Region(config) => run_region(&context, config).await,
        Command::Decode(config) => run_decode(&context, config).await,
        Command::Sweep(config) => run_sweep(&context, config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "region_decode=debug"
    } else {
        "region_decode=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Factory for the region decoder the options ask for.
///
/// `--serialized` builds the raster backend with exclusive locking (config
/// validation rejects it for any other decoder kind); otherwise the decoder
/// kind is looked up in the built-in registry.
fn region_factory(
    source: &SourceArgs,
    serialized: bool,
) -> Result<Box<dyn DecoderFactory<SharedRegionDecoder>>, DecoderError> {
    if serialized {
        let config = RegionDecoderConfig::default().with_lock_policy(LockPolicy::Serialized);
        return Ok(Box::new(BoundDecoderFactory::new(move || {
            Arc::new(RegionDecoder::with_config(RasterBackend, config)) as SharedRegionDecoder
        })));
    }

    let factory = DecoderRegistry::region_defaults().factory(&source.decoder, None)?;
    Ok(Box::new(factory))
}

fn save_image(image: &DecodedImage, output: &Path) -> Result<(), String> {
    image
        .to_rgba8()
        .save(output)
        .map_err(|e| format!("failed to write {}: {}", output.display(), e))
}

// =============================================================================
// Info Command
// =============================================================================

async fn run_info(context: &LocalContext, config: InfoConfig) -> Result<(), String> {
    let decoder = region_factory(&config.source, false)
        .and_then(|factory| factory.make())
        .map_err(|e| e.to_string())?;

    let result = decoder.init(context, &config.uri).await;
    decoder.recycle().await;
    let dimensions = result.map_err(|e| format!("Failed to open {}: {}", config.uri, e))?;

    if config.json {
        let json = serde_json::json!({
            "uri": config.uri,
            "decoder": config.source.decoder,
            "dimensions": dimensions,
        });
        let text = serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else {
        println!("{}", config.uri);
        println!("  Size: {} x {}", dimensions.width, dimensions.height);
        println!("  Decoder: {}", config.source.decoder);
    }

    Ok(())
}

// =============================================================================
// Region Command
// =============================================================================

async fn run_region(context: &LocalContext, config: RegionConfig) -> Result<(), String> {
    let decoder = region_factory(&config.source, config.serialized)
        .and_then(|factory| factory.make())
        .map_err(|e| e.to_string())?;

    let result: Result<DecodedImage, DecoderError> = async {
        decoder.init(context, &config.uri).await?;
        decoder.decode_region(config.rect, config.sample_size).await
    }
    .await;
    decoder.recycle().await;

    let tile = result.map_err(|e| format!("Failed to decode {:?}: {}", config.rect, e))?;
    save_image(&tile, &config.output)?;

    info!(
        width = tile.width,
        height = tile.height,
        format = %tile.format,
        output = %config.output.display(),
        "Region written"
    );
    Ok(())
}

// =============================================================================
// Decode Command
// =============================================================================

async fn run_decode(context: &LocalContext, config: DecodeConfig) -> Result<(), String> {
    let decoder = DecoderRegistry::image_defaults()
        .factory(&config.source.decoder, None)
        .and_then(|factory| factory.make())
        .map_err(|e| e.to_string())?;

    let image = decoder
        .decode(context, &config.uri)
        .await
        .map_err(|e| format!("Failed to decode {}: {}", config.uri, e))?;
    save_image(&image, &config.output)?;

    info!(
        width = image.width,
        height = image.height,
        format = %image.format,
        output = %config.output.display(),
        "Image written"
    );
    Ok(())
}

// =============================================================================
// Sweep Command
// =============================================================================

#[derive(Debug, Default)]
struct SweepStats {
    decoded: usize,
    failed: usize,
    bytes: usize,
    slowest: Duration,
}

async fn run_sweep(context: &LocalContext, config: SweepConfig) -> Result<(), String> {
    let decoder = region_factory(&config.source, config.serialized)
        .and_then(|factory| factory.make())
        .map_err(|e| e.to_string())?;

    let dimensions = match decoder.init(context, &config.uri).await {
        Ok(dimensions) => dimensions,
        Err(e) => {
            decoder.recycle().await;
            return Err(format!("Failed to open {}: {}", config.uri, e));
        }
    };

    let tiles = dimensions.tiles(config.tile_size);
    info!(
        tiles = tiles.len(),
        tile_size = config.tile_size,
        sample_size = config.sample_size,
        concurrency = config.concurrency,
        "Starting sweep"
    );

    let started = Instant::now();
    let stats = sweep_tiles(decoder.clone(), tiles, config.sample_size, config.concurrency).await;
    let elapsed = started.elapsed();
    decoder.recycle().await;

    if config.json {
        let json = serde_json::json!({
            "uri": config.uri,
            "width": dimensions.width,
            "height": dimensions.height,
            "decoded": stats.decoded,
            "failed": stats.failed,
            "bytes": stats.bytes,
            "elapsed_ms": elapsed.as_millis() as u64,
            "slowest_tile_ms": stats.slowest.as_millis() as u64,
        });
        let text = serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else {
        println!("Sweep of {}", config.uri);
        println!("  Size: {} x {}", dimensions.width, dimensions.height);
        println!("  Tiles decoded: {}", stats.decoded);
        println!("  Tiles failed: {}", stats.failed);
        println!("  Pixel data: {:.2} MB", stats.bytes as f64 / (1024.0 * 1024.0));
        println!("  Elapsed: {:.2?} (slowest tile {:.2?})", elapsed, stats.slowest);
    }

    if stats.failed > 0 {
        return Err(format!("{} tile(s) failed to decode", stats.failed));
    }
    Ok(())
}

async fn sweep_tiles(
    decoder: SharedRegionDecoder,
    tiles: Vec<Rect>,
    sample_size: u32,
    concurrency: usize,
) -> SweepStats {
    let permits = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    for rect in tiles {
        let decoder = decoder.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let started = Instant::now();
            let result = decoder.decode_region(rect, sample_size).await;
            (rect, result, started.elapsed())
        });
    }

    let mut stats = SweepStats::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((rect, Ok(tile), took)) => {
                debug!(?rect, width = tile.width, height = tile.height, ?took, "Tile decoded");
                stats.decoded += 1;
                stats.bytes += tile.data.len();
                stats.slowest = stats.slowest.max(took);
            }
            Ok((rect, Err(e), _)) => {
                warn!(?rect, error = %e, "Tile failed");
                stats.failed += 1;
            }
            Err(e) => {
                warn!(error = %e, "Tile task failed");
                stats.failed += 1;
            }
        }
    }
    stats
}
