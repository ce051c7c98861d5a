//! Lock policy integration tests.
//!
//! Tests verify:
//! - Thread-safe backends decode tiles in parallel
//! - Other backends decode strictly one tile at a time
//! - Recycle waits for queued and in-flight decodes under both policies
//! - A pending recycle is not starved by a steady stream of new decodes
//! - A ready decoder reports ready while tiles are being decoded

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use region_decode::decoder::{
    Dimensions, ImageRegionDecoder, LockPolicy, Rect, RegionDecoder, RegionDecoderConfig,
};

use super::test_utils::{MemoryContext, ProbeBackend, ProbeStats, MEMORY_URI};

const TILES: u32 = 50;

async fn decode_many(decoder: Arc<RegionDecoder<ProbeBackend>>) -> usize {
    let mut handles = Vec::new();
    for i in 0..TILES {
        let decoder = decoder.clone();
        handles.push(tokio::spawn(async move {
            decoder.decode_region(Rect::from_xywh(i * 10, 0, 10, 10), 1).await
        }));
    }

    let mut decoded = 0;
    for handle in handles {
        handle.await.unwrap().unwrap();
        decoded += 1;
    }
    decoded
}

async fn ready_decoder(backend: ProbeBackend, config: RegionDecoderConfig) -> (Arc<RegionDecoder<ProbeBackend>>, Arc<ProbeStats>) {
    let stats = backend.stats();
    let decoder = Arc::new(RegionDecoder::with_config(backend, config));
    decoder
        .init(&MemoryContext::new(vec![0u8; 4]), MEMORY_URI)
        .await
        .unwrap();
    (decoder, stats)
}

fn probe(synchronized: bool) -> ProbeBackend {
    ProbeBackend::new(synchronized, Dimensions::new(1000, 10)).with_delay(Duration::from_millis(20))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_policy_runs_in_parallel() {
    let (decoder, stats) = ready_decoder(probe(true), RegionDecoderConfig::default()).await;
    assert_eq!(decoder.lock_policy(), LockPolicy::Shared);

    assert_eq!(decode_many(decoder.clone()).await, TILES as usize);
    assert_eq!(stats.decodes(), TILES as usize);
    assert!(
        stats.max_active() > 1,
        "expected overlapping decodes, max was {}",
        stats.max_active()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_serialized_policy_runs_one_at_a_time() {
    let (decoder, stats) = ready_decoder(probe(false), RegionDecoderConfig::default()).await;
    assert_eq!(decoder.lock_policy(), LockPolicy::Serialized);

    assert_eq!(decode_many(decoder.clone()).await, TILES as usize);
    assert_eq!(stats.decodes(), TILES as usize);
    assert_eq!(stats.max_active(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_forced_serialization_of_thread_safe_backend() {
    let config = RegionDecoderConfig::default().with_lock_policy(LockPolicy::Serialized);
    let (decoder, stats) = ready_decoder(probe(true), config).await;

    decode_many(decoder).await;
    assert_eq!(stats.max_active(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_recycle_after_queued_serialized_decodes() {
    let (decoder, stats) = ready_decoder(probe(false), RegionDecoderConfig::default()).await;

    let mut handles = Vec::new();
    for i in 0..5u32 {
        let decoder = decoder.clone();
        handles.push(tokio::spawn(async move {
            decoder.decode_region(Rect::from_xywh(i * 10, 0, 10, 10), 1).await
        }));
    }

    // Let the decodes queue up on the lock ahead of recycle.
    tokio::time::sleep(Duration::from_millis(5)).await;
    decoder.recycle().await;

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.is_ok() || result.unwrap_err().is_illegal_state());
    }
    assert_eq!(stats.active(), 0);
    assert_eq!(stats.used_after_drop(), 0);
    assert!(stats.dropped());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_recycle_not_starved_by_steady_decodes() {
    let backend = ProbeBackend::new(true, Dimensions::new(1000, 10)).with_delay(Duration::from_millis(5));
    let (decoder, stats) = ready_decoder(backend, RegionDecoderConfig::default()).await;
    let stop = Arc::new(AtomicBool::new(false));

    // Issue a new decode every millisecond so shared reads always overlap.
    let feeder = {
        let decoder = decoder.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            let mut handles = Vec::new();
            let mut i = 0u32;
            while !stop.load(Ordering::Relaxed) {
                let decoder = decoder.clone();
                let left = (i % 100) * 10;
                handles.push(tokio::spawn(async move {
                    decoder.decode_region(Rect::from_xywh(left, 0, 10, 10), 1).await
                }));
                i += 1;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            handles
        })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    tokio::time::timeout(Duration::from_secs(5), decoder.recycle())
        .await
        .expect("recycle should finish while decodes keep arriving");

    let late = decoder.decode_region(Rect::from_xywh(0, 0, 10, 10), 1).await;
    assert!(late.unwrap_err().is_illegal_state());

    // Keep feeding for a while after recycle before stopping.
    tokio::time::sleep(Duration::from_millis(20)).await;
    stop.store(true, Ordering::Relaxed);

    let mut ok = 0;
    let mut rejected = 0;
    for handle in feeder.await.unwrap() {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(e) => {
                assert!(e.is_illegal_state(), "unexpected error: {}", e);
                rejected += 1;
            }
        }
    }

    assert!(ok > 0);
    assert!(rejected > 0);
    assert_eq!(stats.decodes(), ok);
    assert_eq!(stats.used_after_drop(), 0);
    assert_eq!(stats.active(), 0);
    assert!(stats.dropped());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_is_ready_while_decoding() {
    let (decoder, stats) = ready_decoder(probe(true), RegionDecoderConfig::default()).await;

    let sweep = tokio::spawn(decode_many(decoder.clone()));
    let mut saw_active = false;
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(3)).await;
        saw_active |= stats.active() > 0;
        assert!(decoder.is_ready().await);
    }

    assert_eq!(sweep.await.unwrap(), TILES as usize);
    assert!(saw_active, "readiness was never checked during a decode");
    assert!(decoder.is_ready().await);
}
