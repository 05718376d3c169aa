// End-to-end pipeline tests: orchestrator + processor + store + renderer,
// with the remote transformer replaced by an in-process fake.

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use scantrad_backend::{
    map_boxes, BatchOrchestrator, BatchRecord, BatchStatus, BatchStore, MemoryStore, Metrics,
    NormalizedBox, NotificationHub, PageRecord, PageStatus, PixelBox, RegionTransformer,
    TextRenderer,
};

/// Transformer fake. Fails detection for the first `fail_first` pages,
/// then succeeds with a single centered region.
struct FakeTransformer {
    fail_first: usize,
    calls: AtomicUsize,
}

impl FakeTransformer {
    fn new(fail_first: usize) -> Self {
        Self {
            fail_first,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RegionTransformer for FakeTransformer {
    async fn detect_regions(&self, _image: &DynamicImage) -> Result<Vec<NormalizedBox>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(anyhow!("detection backend unavailable"));
        }
        Ok(vec![NormalizedBox {
            cx: 0.5,
            cy: 0.5,
            w: 0.5,
            h: 0.5,
        }])
    }

    async fn extract_and_translate(
        &self,
        image: &DynamicImage,
        boxes: &[NormalizedBox],
    ) -> Result<Vec<(PixelBox, String)>> {
        let regions = map_boxes(boxes, image.width(), image.height());
        Ok(regions
            .into_iter()
            .map(|region| (region, "translated".to_string()))
            .collect())
    }
}

fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 32, Rgba([80, 80, 80, 255])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn page(page_id: &str, batch_id: &str, payload: Vec<u8>) -> PageRecord {
    PageRecord {
        page_id: page_id.to_string(),
        batch_id: batch_id.to_string(),
        filename: format!("{page_id}.png"),
        status: PageStatus::Pending,
        original_image: Arc::new(payload),
        translated_image: None,
        error_message: None,
    }
}

fn batch(batch_id: &str, page_ids: &[&str]) -> BatchRecord {
    BatchRecord {
        batch_id: batch_id.to_string(),
        user_id: "u1".to_string(),
        page_ids: page_ids.iter().map(|s| s.to_string()).collect(),
        status: BatchStatus::Pending,
        created_at: Utc::now(),
    }
}

struct Harness {
    store: Arc<dyn BatchStore>,
    orchestrator: BatchOrchestrator,
    hub: NotificationHub,
}

fn harness(transformer: FakeTransformer) -> Harness {
    let store: Arc<dyn BatchStore> = Arc::new(MemoryStore::new());
    let renderer = Arc::new(TextRenderer::new(Path::new("no-such-font-dir"), 16.0));
    let hub = NotificationHub::default();
    let orchestrator = BatchOrchestrator::new(
        Arc::clone(&store),
        Arc::new(transformer),
        renderer,
        hub.clone(),
        Metrics::new(),
    );
    Harness {
        store,
        orchestrator,
        hub,
    }
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut messages = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        messages.push(msg);
    }
    messages
}

#[tokio::test]
async fn failing_page_does_not_block_siblings() {
    let h = harness(FakeTransformer::new(1));
    h.store
        .insert_batch(
            batch("b1", &["pa", "pb"]),
            vec![
                page("pa", "b1", png_bytes()),
                page("pb", "b1", png_bytes()),
            ],
        )
        .await
        .unwrap();

    let (_id, mut rx) = h.hub.subscribe();
    h.orchestrator.run_batch("b1").await;

    let pa = h.store.get_page("pa").await.unwrap().unwrap();
    assert_eq!(pa.status, PageStatus::Error);
    let description = pa.error_message.expect("failed page keeps a description");
    assert!(!description.is_empty());
    assert!(pa.translated_image.is_none());

    // The sibling still ran to completion
    let pb = h.store.get_page("pb").await.unwrap().unwrap();
    assert_eq!(pb.status, PageStatus::Done);
    assert!(pb.translated_image.is_some());

    // Completion marks the end of orchestration even with failures
    let b = h.store.get_batch("b1").await.unwrap().unwrap();
    assert_eq!(b.status, BatchStatus::Completed);

    // Only the successful page enters history
    let history = h
        .store
        .translated_pages_for_batch("u1", "b1", 100)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].page_id, "pb");

    let messages = drain(&mut rx);
    assert!(messages.iter().any(|m| m.starts_with("Page pa.png failed:")));
    assert!(messages.iter().any(|m| m == "Page pb.png is done"));
}

#[tokio::test]
async fn two_page_batch_runs_to_done() {
    let h = harness(FakeTransformer::new(0));
    h.store
        .insert_batch(
            batch("b1", &["p1", "p2"]),
            vec![
                page("p1", "b1", png_bytes()),
                page("p2", "b1", png_bytes()),
            ],
        )
        .await
        .unwrap();

    h.store
        .insert_user(scantrad_backend::UserRecord {
            user_id: "u1".to_string(),
            pseudo: "kai".to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let (_id, mut rx) = h.hub.subscribe();
    h.orchestrator.run_batch("b1").await;

    let pages = h.store.pages_for_batch("b1").await.unwrap();
    assert!(pages.iter().all(|p| p.status == PageStatus::Done));

    // Every page done aggregates to done on read
    let statuses: Vec<PageStatus> = pages.iter().map(|p| p.status).collect();
    let b = h.store.get_batch("b1").await.unwrap().unwrap();
    assert_eq!(
        scantrad_backend::derive_batch_status(&statuses, b.status),
        BatchStatus::Done
    );

    // One history record per page, ordered by completion
    let history = h
        .store
        .translated_pages_for_batch("u1", "b1", 100)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|t| t.batch_id == "b1"));
    assert_eq!(history[0].page_id, "p1");
    assert_eq!(history[1].page_id, "p2");

    // The rendered output is a decodable image
    assert!(image::load_from_memory(&history[0].translated_image).is_ok());

    let messages = drain(&mut rx);
    assert_eq!(
        messages
            .iter()
            .filter(|m| m.ends_with("is processing"))
            .count(),
        2
    );
    assert_eq!(
        messages.iter().filter(|m| m.ends_with("is done")).count(),
        2
    );
}

#[tokio::test]
async fn undecodable_payload_fails_only_that_page() {
    let h = harness(FakeTransformer::new(0));
    h.store
        .insert_batch(
            batch("b1", &["bad", "good"]),
            vec![
                page("bad", "b1", b"definitely not an image".to_vec()),
                page("good", "b1", png_bytes()),
            ],
        )
        .await
        .unwrap();

    h.orchestrator.run_batch("b1").await;

    let bad = h.store.get_page("bad").await.unwrap().unwrap();
    assert_eq!(bad.status, PageStatus::Error);
    assert!(bad.error_message.is_some());

    let good = h.store.get_page("good").await.unwrap().unwrap();
    assert_eq!(good.status, PageStatus::Done);

    let b = h.store.get_batch("b1").await.unwrap().unwrap();
    assert_eq!(b.status, BatchStatus::Completed);
}

#[tokio::test]
async fn missing_batch_is_a_quiet_no_op() {
    let h = harness(FakeTransformer::new(0));
    let (_id, mut rx) = h.hub.subscribe();

    h.orchestrator.run_batch("no-such-batch").await;

    assert!(drain(&mut rx).is_empty());
}
