//! Region decoder integration tests.
//!
//! Tests verify:
//! - Tiles decoded from real PNG sources carry the right pixels
//! - Sampled output sizes for large sources
//! - The init / decode / recycle lifecycle seen from outside
//! - Racing decodes against recycle never crashes

use std::sync::Arc;
use std::time::Duration;

use region_decode::decoder::{
    Dimensions, ImageRegionDecoder, PixelFormat, RasterBackend, Rect, RegionDecoder,
};
use region_decode::error::DecoderError;

use super::test_utils::{
    png_bytes, quadrant_image, MemoryContext, ProbeBackend, SourceFixture, BLUE, GREEN, MEMORY_URI,
    PACKAGE, RED, WHITE,
};

fn raster_decoder() -> RegionDecoder {
    RegionDecoder::with_pixel_format(RasterBackend, Some(PixelFormat::Argb8888))
}

// =============================================================================
// Real Sources
// =============================================================================

#[tokio::test]
async fn test_png_tiles_have_expected_pixels() {
    let fixture = SourceFixture::new();
    fixture.asset("map.png", &png_bytes(&quadrant_image(256, 128)));
    let context = fixture.context();

    let decoder = raster_decoder();
    let dims = decoder.init(&context, "file:///android_asset/map.png").await.unwrap();
    assert_eq!(dims, Dimensions::new(256, 128));

    // Full-resolution tile straddling the vertical border.
    let tile = decoder.decode_region(Rect::new(120, 0, 136, 16), 1).await.unwrap();
    assert_eq!((tile.width, tile.height), (16, 16));
    assert_eq!(tile.format, PixelFormat::Argb8888);
    assert_eq!(tile.pixel_rgba(0, 0), Some(RED));
    assert_eq!(tile.pixel_rgba(15, 0), Some(GREEN));

    // Whole image at sample size 4: each quadrant stays solid.
    let overview = decoder.decode_region(dims.bounds(), 4).await.unwrap();
    assert_eq!((overview.width, overview.height), (64, 32));
    assert_eq!(overview.pixel_rgba(0, 31), Some(BLUE));
    assert_eq!(overview.pixel_rgba(63, 31), Some(WHITE));

    decoder.recycle().await;
}

#[tokio::test]
async fn test_resource_source_by_name() {
    let fixture = SourceFixture::new();
    fixture.drawable("poster.png", &png_bytes(&quadrant_image(30, 20)));
    let context = fixture.context();

    let decoder = raster_decoder();
    let uri = format!("android.resource://{}/drawable/poster", PACKAGE);
    assert_eq!(decoder.init(&context, &uri).await.unwrap(), Dimensions::new(30, 20));

    let tile = decoder.decode_region(Rect::new(20, 15, 30, 20), 1).await.unwrap();
    assert_eq!(tile.pixel_rgba(0, 0), Some(WHITE));
}

#[tokio::test]
async fn test_region_is_clipped_to_image() {
    let fixture = SourceFixture::new();
    fixture.asset("small.png", &png_bytes(&quadrant_image(50, 50)));
    let context = fixture.context();

    let decoder = raster_decoder();
    decoder.init(&context, "file:///android_asset/small.png").await.unwrap();

    let edge = decoder.decode_region(Rect::new(40, 40, 90, 90), 2).await.unwrap();
    assert_eq!((edge.width, edge.height), (5, 5));

    let outside = decoder.decode_region(Rect::new(60, 60, 70, 70), 1).await;
    assert!(matches!(outside, Err(DecoderError::Decode { .. })));
    assert!(decoder.is_ready().await);
}

#[tokio::test]
async fn test_init_failure_leaves_decoder_uninitialized() {
    let fixture = SourceFixture::new();
    let context = fixture.context();

    let decoder = raster_decoder();
    let result = decoder.init(&context, "file:///android_asset/absent.png").await;
    assert!(matches!(result, Err(DecoderError::Source(_))));
    assert!(!decoder.is_ready().await);

    // A later init on the same decoder may still succeed.
    fixture.asset("absent.png", &png_bytes(&quadrant_image(4, 4)));
    assert!(decoder.init(&context, "file:///android_asset/absent.png").await.is_ok());
}

// =============================================================================
// Sampled Sizes
// =============================================================================

#[tokio::test]
async fn test_large_source_sample_size() {
    let backend = ProbeBackend::new(true, Dimensions::new(2000, 3000));
    let decoder = RegionDecoder::new(backend);
    let context = MemoryContext::new(vec![0u8; 4]);

    let dims = decoder.init(&context, MEMORY_URI).await.unwrap();
    assert_eq!(dims, Dimensions::new(2000, 3000));

    let tile = decoder.decode_region(Rect::new(0, 0, 500, 500), 4).await.unwrap();
    assert_eq!((tile.width, tile.height), (125, 125));
    assert_eq!(tile.data.len(), tile.stride() * 125);

    // Sizes round down but never reach zero.
    let sliver = decoder.decode_region(Rect::new(0, 0, 3, 3), 8).await.unwrap();
    assert_eq!((sliver.width, sliver.height), (1, 1));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_lifecycle_from_outside() {
    let backend = ProbeBackend::new(true, Dimensions::new(100, 100));
    let stats = backend.stats();
    let decoder = RegionDecoder::new(backend);
    let context = MemoryContext::new(vec![0u8; 4]);

    assert!(!decoder.is_ready().await);
    assert!(decoder
        .decode_region(Rect::new(0, 0, 10, 10), 1)
        .await
        .unwrap_err()
        .is_illegal_state());

    decoder.init(&context, MEMORY_URI).await.unwrap();
    assert!(decoder.is_ready().await);
    decoder.decode_region(Rect::new(0, 0, 10, 10), 1).await.unwrap();

    decoder.recycle().await;
    assert!(!decoder.is_ready().await);
    assert!(stats.dropped());

    let after = decoder.decode_region(Rect::new(0, 0, 10, 10), 1).await;
    assert!(after.unwrap_err().is_illegal_state());
    assert_eq!(stats.decodes(), 1);
    assert_eq!(context.opened(), 1);

    // Recycling again changes nothing.
    decoder.recycle().await;
    assert!(!decoder.is_ready().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_decode_racing_recycle() {
    let backend = ProbeBackend::new(true, Dimensions::new(4096, 4096))
        .with_delay(Duration::from_millis(5));
    let stats = backend.stats();
    let decoder = Arc::new(RegionDecoder::new(backend));
    let context = MemoryContext::new(vec![0u8; 4]);
    decoder.init(&context, MEMORY_URI).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..64u32 {
        let decoder = decoder.clone();
        handles.push(tokio::spawn(async move {
            let left = (i % 8) * 512;
            let top = (i / 8) * 512;
            decoder.decode_region(Rect::from_xywh(left, top, 512, 512), 2).await
        }));
    }

    tokio::time::sleep(Duration::from_millis(10)).await;
    decoder.recycle().await;

    let mut ok = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(tile) => {
                assert_eq!((tile.width, tile.height), (256, 256));
                ok += 1;
            }
            Err(e) => {
                assert!(e.is_illegal_state(), "unexpected error: {}", e);
                rejected += 1;
            }
        }
    }

    assert_eq!(ok + rejected, 64);
    assert_eq!(stats.decodes(), ok);
    assert_eq!(stats.used_after_drop(), 0);
    assert_eq!(stats.active(), 0);
    assert!(stats.dropped());
}
