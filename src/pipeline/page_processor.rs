// Page Processor: drives one page through pending → processing →
// {done | error}, invoking the transformer and the renderer, persisting
// page state and emitting progress events.
//
// Page failures are isolated: any error is captured into the page's
// error state and never propagated to the orchestrator, so sibling
// pages keep processing.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::errors::{PageError, PageResult, StoreError};
use crate::core::types::{PageRecord, TranslatedPageRecord};
use crate::inference::RegionTransformer;
use crate::notify::NotificationHub;
use crate::rendering::TextRenderer;
use crate::store::BatchStore;
use crate::utils::image_ops::load_image_from_memory_async;
use crate::utils::Metrics;

pub struct PageProcessor {
    store: Arc<dyn BatchStore>,
    transformer: Arc<dyn RegionTransformer>,
    renderer: Arc<TextRenderer>,
    hub: NotificationHub,
    metrics: Metrics,
}

impl PageProcessor {
    pub fn new(
        store: Arc<dyn BatchStore>,
        transformer: Arc<dyn RegionTransformer>,
        renderer: Arc<TextRenderer>,
        hub: NotificationHub,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            transformer,
            renderer,
            hub,
            metrics,
        }
    }

    /// Process one pending page to a terminal state.
    ///
    /// Never returns an error for pipeline failures; those end up in the
    /// page's error state and a "failed" event. Only store-level
    /// inconsistencies (e.g. the page vanished mid-flight) bubble up as
    /// a warning logged by the caller's orchestration loop.
    pub async fn process(&self, page: PageRecord) {
        match self.run_stages(&page).await {
            Ok(()) => {
                self.metrics.record_page_done();
                self.broadcast(&format!("Page {} is done", page.filename));
            }
            Err(err) => {
                let description = err.to_string();
                warn!(
                    page_id = %page.page_id,
                    filename = %page.filename,
                    "page failed: {description}"
                );
                if let Err(store_err) = self.store.fail_page(&page.page_id, &description).await {
                    // The page may already be terminal; nothing left to record
                    warn!(page_id = %page.page_id, "could not persist page failure: {store_err}");
                }
                self.metrics.record_page_failed();
                self.broadcast(&format!("Page {} failed: {description}", page.filename));
            }
        }
    }

    async fn run_stages(&self, page: &PageRecord) -> PageResult<()> {
        // 1. Mark processing and tell subscribers.
        self.store.set_page_processing(&page.page_id).await?;
        self.broadcast(&format!("Page {} is processing", page.filename));

        // 2. Decode the stored payload. A corrupt or unsupported payload
        //    is terminal; there is no retry.
        let image = load_image_from_memory_async(&page.original_image)
            .await
            .map_err(|e| match e.downcast::<image::ImageError>() {
                Ok(img_err) => PageError::Decode(img_err),
                Err(other) => PageError::Inference(other),
            })?;

        // 3. Opaque detection + extraction + translation.
        let boxes = self
            .transformer
            .detect_regions(&image)
            .await
            .map_err(PageError::Inference)?;
        let translations = self
            .transformer
            .extract_and_translate(&image, &boxes)
            .await
            .map_err(PageError::Inference)?;

        info!(
            page_id = %page.page_id,
            regions = translations.len(),
            "transformed page {}",
            page.filename
        );

        // 4. Render translated text into the original bounds and encode.
        let translated_bytes = self
            .renderer
            .render_page(image, &translations)
            .await
            .map_err(PageError::Render)?;

        // 5. Persist the terminal state and the append-only history record
        //    as one logical update.
        let translated = Arc::new(translated_bytes);
        self.store
            .complete_page(&page.page_id, translated.as_ref().clone())
            .await?;

        let record = TranslatedPageRecord {
            id: Uuid::new_v4().to_string(),
            page_id: page.page_id.clone(),
            user_id: self.owner_of(&page.batch_id).await?,
            batch_id: page.batch_id.clone(),
            filename: page.filename.clone(),
            original_image: Arc::clone(&page.original_image),
            translated_image: translated,
            completed_at: Utc::now(),
        };
        self.store.insert_translated_page(record).await?;

        Ok(())
    }

    fn broadcast(&self, message: &str) {
        self.hub.broadcast(message);
        self.metrics.record_broadcast();
    }

    async fn owner_of(&self, batch_id: &str) -> Result<String, StoreError> {
        let batch = self
            .store
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| StoreError::not_found("batch", batch_id))?;
        Ok(batch.user_id)
    }
}
