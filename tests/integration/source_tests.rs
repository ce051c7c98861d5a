//! Source resolution integration tests.
//!
//! Tests verify:
//! - Every URI form resolves to the same image
//! - Named drawables resolve like a resource table lookup
//! - Unknown names and ids surface as errors, never as a crash
//! - Other packages' resources are read from their own table

use region_decode::decoder::{ImageDecoder, PixelFormat, RasterImageDecoder};
use region_decode::error::{DecoderError, SourceError};
use region_decode::source::{
    open_source, AccessMode, ResourceTable, ResourceTarget, SourceContext, SourceRef, SourceStream,
    FIRST_DRAWABLE_ID, NO_RESOURCE_ID,
};

use super::test_utils::{png_bytes, quadrant_image, SourceFixture, BLUE, PACKAGE, RED, WHITE};

fn decoder() -> RasterImageDecoder {
    RasterImageDecoder::with_pixel_format(Some(PixelFormat::Argb8888))
}

// =============================================================================
// URI Forms
// =============================================================================

#[tokio::test]
async fn test_all_uri_forms_decode_same_image() {
    let png = png_bytes(&quadrant_image(40, 30));
    let fixture = SourceFixture::new();
    fixture.drawable("page.png", &png);
    fixture.asset("docs/page.png", &png);
    fixture.media("scans/page.png", &png);
    let file = fixture.file("page.png", &png);
    let context = fixture.context();

    let uris = vec![
        format!("android.resource://{}/drawable/page", PACKAGE),
        format!("android.resource://{}/{}", PACKAGE, FIRST_DRAWABLE_ID),
        "file:///android_asset/docs/page.png".to_string(),
        format!("file://{}", file.display()),
        "content://media/scans/page.png".to_string(),
    ];

    for uri in &uris {
        let image = decoder()
            .decode(&context, uri)
            .await
            .unwrap_or_else(|e| panic!("Failed to decode {}: {}", uri, e));

        assert_eq!((image.width, image.height), (40, 30), "{}", uri);
        assert_eq!(image.pixel_rgba(0, 0), Some(RED), "{}", uri);
        assert_eq!(image.pixel_rgba(5, 20), Some(BLUE), "{}", uri);
        assert_eq!(image.pixel_rgba(39, 29), Some(WHITE), "{}", uri);
    }
}

#[tokio::test]
async fn test_named_drawable_matches_table_lookup() {
    let fixture = SourceFixture::new();
    fixture.drawable("alpha.png", b"a");
    fixture.drawable("beta.png", b"b");
    let context = fixture.context();

    let table = context.resources();
    let id = table.identifier("beta", "drawable");
    assert_ne!(id, NO_RESOURCE_ID);

    let by_name = SourceRef::parse(&format!("android.resource://{}/drawable/beta", PACKAGE));
    let by_id = SourceRef::parse(&format!("android.resource://{}/{}", PACKAGE, id));
    assert!(matches!(
        &by_id,
        SourceRef::Resource { target: ResourceTarget::Id(parsed), .. } if *parsed == id
    ));

    let named = open_source(&context, &by_name, AccessMode::Streaming).await.unwrap();
    let numbered = open_source(&context, &by_id, AccessMode::Streaming).await.unwrap();
    assert_eq!(named.into_bytes().await.unwrap(), numbered.into_bytes().await.unwrap());
}

#[tokio::test]
async fn test_random_asset_access_yields_path() {
    let fixture = SourceFixture::new();
    let path = fixture.asset("tiles/big.png", b"data");
    let context = fixture.context();

    let source = SourceRef::parse("file:///android_asset/tiles/big.png");
    match open_source(&context, &source, AccessMode::Random).await.unwrap() {
        SourceStream::Path(opened) => assert_eq!(opened, path),
        other => panic!("Expected a path, got {}", other.describe()),
    }

    match open_source(&context, &source, AccessMode::Streaming).await.unwrap() {
        SourceStream::Bytes(bytes) => assert_eq!(&bytes[..], b"data"),
        other => panic!("Expected bytes, got {}", other.describe()),
    }
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_unknown_drawable_is_resource_not_found() {
    let fixture = SourceFixture::new();
    fixture.drawable("page.png", b"x");
    let context = fixture.context();

    let uri = format!("android.resource://{}/drawable/missing", PACKAGE);
    let result = decoder().decode(&context, &uri).await;

    match result {
        Err(DecoderError::Source(SourceError::ResourceNotFound { package, id })) => {
            assert_eq!(package, PACKAGE);
            assert_eq!(id, NO_RESOURCE_ID);
        }
        other => panic!("Expected ResourceNotFound, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_non_numeric_id_falls_back_to_zero() {
    let context = SourceFixture::new().context();

    let source = SourceRef::parse(&format!("android.resource://{}/not-a-number", PACKAGE));
    assert!(matches!(
        &source,
        SourceRef::Resource { target: ResourceTarget::Id(NO_RESOURCE_ID), .. }
    ));

    let result = open_source(&context, &source, AccessMode::Streaming).await;
    assert!(matches!(result, Err(SourceError::ResourceNotFound { .. })));
}

#[tokio::test]
async fn test_unknown_package_is_reported() {
    let context = SourceFixture::new().context();

    let result = decoder()
        .decode(&context, "android.resource://com.other.app/drawable/page")
        .await;
    assert!(matches!(
        result,
        Err(DecoderError::Source(SourceError::PackageNotFound(ref p))) if p == "com.other.app"
    ));
}

#[tokio::test]
async fn test_other_package_resources() {
    let png = png_bytes(&quadrant_image(8, 8));
    let other = SourceFixture::new();
    other.drawable("logo.png", &png);

    let context = SourceFixture::new()
        .context()
        .with_package("com.other.app", &other.root().join("res"))
        .unwrap();

    let image = decoder()
        .decode(&context, "android.resource://com.other.app/drawable/logo")
        .await
        .unwrap();
    assert_eq!((image.width, image.height), (8, 8));
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let fixture = SourceFixture::new();
    let context = fixture.context();
    let uri = format!("file://{}", fixture.root().join("nope.png").display());

    let result = decoder().decode(&context, &uri).await;
    assert!(matches!(result, Err(DecoderError::Source(SourceError::Io { .. }))));
}

#[tokio::test]
async fn test_garbage_asset_is_decode_error() {
    let fixture = SourceFixture::new();
    fixture.asset("notes.txt", b"definitely not pixels");
    let context = fixture.context();

    let result = decoder().decode(&context, "file:///android_asset/notes.txt").await;
    assert!(matches!(result, Err(DecoderError::Decode { .. })));
}
