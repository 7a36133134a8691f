//! End-to-end tests against the real collaborators: pdfium, the image host
//! and Firestore.
//!
//! They are gated behind the `E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested. Each test also needs its own
//! credentials and skips when they are missing.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture

use std::sync::Arc;
use storefront_ingest::model::PRODUCTS;
use storefront_ingest::pipeline::upload::parse_upload_response;
use storefront_ingest::store::DocumentStore;
use storefront_ingest::{
    AssetUploader, DocumentRasterizer, FirestoreConfig, FirestoreStore, ImgbbUploader,
    IngestionConfig, IngestionOrchestrator, IngestionProgressCallback, NoopProgressCallback,
    PdfiumRasterizer, RenderProfile, SourceFile, UploadConfig,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip unless E2E_ENABLED is set; evaluates to the named env vars.
macro_rules! e2e_skip_unless {
    ($($var:literal),*) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        ($(
            match std::env::var($var) {
                Ok(v) if !v.is_empty() => v,
                _ => {
                    println!("SKIP: {} is not set", $var);
                    return;
                }
            }
        ),*)
    }};
}

fn rasterizer() -> PdfiumRasterizer {
    match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) => PdfiumRasterizer::with_library(p),
        Err(_) => PdfiumRasterizer::new(),
    }
}

/// Two blank A6 pages. The cross-reference table is omitted; pdfium rebuilds it.
fn two_page_pdf() -> Vec<u8> {
    b"%PDF-1.4
1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj
2 0 obj << /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >> endobj
3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 298 420] >> endobj
4 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 298 420] >> endobj
trailer << /Root 1 0 R /Size 5 >>
%%EOF
"
    .to_vec()
}

fn jpeg_fixture() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        64,
        64,
        image::Rgb([240, 80, 20]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();
    buf
}

// ── Rasterisation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rasterize_two_pages_in_order() {
    e2e_skip_unless!();

    let pages = rasterizer()
        .rasterize_pages(&two_page_pdf(), RenderProfile::default())
        .await
        .expect("pdfium should render the fixture");

    assert_eq!(pages.len(), 2);
    assert_eq!(
        pages.iter().map(|p| p.page_num).collect::<Vec<_>>(),
        vec![1, 2]
    );
    for p in &pages {
        // 298×420 pt at 0.5× scale.
        assert!((148..=150).contains(&p.width), "width {}", p.width);
        assert!((209..=211).contains(&p.height), "height {}", p.height);
        assert_eq!(
            image::guess_format(&p.jpeg).unwrap(),
            image::ImageFormat::Jpeg
        );
    }
}

#[tokio::test]
async fn test_rasterize_rejects_corrupt_pdf() {
    e2e_skip_unless!();

    match rasterizer()
        .rasterize_pages(b"%PDF-1.4 garbage garbage", RenderProfile::default())
        .await
    {
        Ok(pages) => assert!(pages.is_empty(), "rendered {} pages from garbage", pages.len()),
        Err(err) => println!("corrupt PDF → {err}"),
    }
}

// ── Upload ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_imgbb_upload_returns_public_url() {
    let key = e2e_skip_unless!("IMGBB_API_KEY");

    let uploader = ImgbbUploader::new(UploadConfig {
        api_key: Some(key),
        ..UploadConfig::default()
    })
    .unwrap();
    let url = uploader.upload(&jpeg_fixture()).await.unwrap();
    println!("uploaded → {url}");
    assert!(url.starts_with("https://"));
}

#[tokio::test]
async fn test_imgbb_bad_key_is_upload_error() {
    e2e_skip_unless!();

    let uploader = ImgbbUploader::new(UploadConfig {
        api_key: Some("definitely-not-a-key".into()),
        ..UploadConfig::default()
    })
    .unwrap();
    let err = uploader.upload(&jpeg_fixture()).await.unwrap_err();
    println!("bad key → {err}");
    assert!(matches!(
        err,
        storefront_ingest::StorefrontError::Upload { .. }
    ));
}

// ── Full pipeline ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_bulk_ingest_into_firestore() {
    let (key, project, fs_key, store_id) = e2e_skip_unless!(
        "IMGBB_API_KEY",
        "STOREFRONT_FIRESTORE_PROJECT",
        "STOREFRONT_FIRESTORE_API_KEY",
        "STOREFRONT_STORE_ID"
    );

    let mut fs_config = FirestoreConfig::new(project);
    fs_config.api_key = Some(fs_key);
    let store = Arc::new(FirestoreStore::new(fs_config).unwrap());

    let orchestrator = IngestionOrchestrator::new(
        store_id,
        Arc::new(rasterizer()),
        Arc::new(
            ImgbbUploader::new(UploadConfig {
                api_key: Some(key),
                ..UploadConfig::default()
            })
            .unwrap(),
        ),
        Arc::new(storefront_ingest::DocumentCatalogWriter::new(store.clone())),
        IngestionConfig::default(),
    );

    let report = orchestrator
        .ingest_bulk(vec![SourceFile::new("e2e-item.jpg", jpeg_fixture())], "1")
        .await
        .unwrap();
    assert!(report.is_complete_success(), "{report:?}");

    // Clean up the record; the hosted image stays.
    let id = report.items[0].product_id.clone().unwrap();
    assert!(store.get(PRODUCTS, &id).await.unwrap().is_some());
    orchestrator.delete_product(&id).await.unwrap();
    assert!(store.get(PRODUCTS, &id).await.unwrap().is_none());
}

// ── Always-on checks ─────────────────────────────────────────────────────────

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
    assert_send_sync::<IngestionOrchestrator>();
}

#[tokio::test]
async fn test_callback_send_in_tokio_spawn() {
    let cb: Arc<dyn IngestionProgressCallback> = Arc::new(NoopProgressCallback);
    let handle = tokio::spawn(async move {
        cb.on_batch_start(3);
        cb.on_item_error(2, 3, "upload failed");
        cb.on_batch_complete(3, 2);
    });
    handle.await.unwrap();
}

#[test]
fn test_proxy_style_response_parses() {
    let body = r#"{"success":true,"data":{"url":"https://img.example/p.jpg"}}"#;
    assert_eq!(
        parse_upload_response(200, body).unwrap(),
        "https://img.example/p.jpg"
    );
}
