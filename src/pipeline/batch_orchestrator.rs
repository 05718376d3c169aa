// Batch Orchestrator: sequences the Page Processor over all pages of a
// batch and finalizes the batch.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::inference::RegionTransformer;
use crate::notify::NotificationHub;
use crate::pipeline::page_processor::PageProcessor;
use crate::rendering::TextRenderer;
use crate::store::BatchStore;
use crate::utils::Metrics;

pub struct BatchOrchestrator {
    store: Arc<dyn BatchStore>,
    processor: PageProcessor,
    metrics: Metrics,
}

impl BatchOrchestrator {
    pub fn new(
        store: Arc<dyn BatchStore>,
        transformer: Arc<dyn RegionTransformer>,
        renderer: Arc<TextRenderer>,
        hub: NotificationHub,
        metrics: Metrics,
    ) -> Self {
        let processor = PageProcessor::new(
            Arc::clone(&store),
            transformer,
            renderer,
            hub,
            metrics.clone(),
        );
        Self {
            store,
            processor,
            metrics,
        }
    }

    /// Drive every page of the batch to a terminal state, then mark the
    /// batch completed.
    ///
    /// Pages run strictly sequentially to bound the load on the
    /// heavyweight inference step. A missing batch is a silent no-op and
    /// a missing page is skipped; neither fails the run. Completion is
    /// unconditional: it records that orchestration finished iterating,
    /// not that every page succeeded.
    #[instrument(skip(self))]
    pub async fn run_batch(&self, batch_id: &str) {
        let batch = match self.store.get_batch(batch_id).await {
            Ok(Some(batch)) => batch,
            Ok(None) => {
                debug!("batch {batch_id} not found, nothing to do");
                return;
            }
            Err(e) => {
                warn!("failed to load batch {batch_id}: {e}");
                return;
            }
        };

        info!("processing batch {batch_id} with {} page(s)", batch.page_ids.len());

        for page_id in &batch.page_ids {
            let page = match self.store.get_page(page_id).await {
                Ok(Some(page)) => page,
                Ok(None) => {
                    debug!("page {page_id} missing, skipping");
                    continue;
                }
                Err(e) => {
                    warn!("failed to load page {page_id}: {e}");
                    continue;
                }
            };

            // Failures are absorbed inside the processor; the next page
            // always gets its turn.
            self.processor.process(page).await;
        }

        if let Err(e) = self.store.complete_batch(batch_id).await {
            warn!("failed to mark batch {batch_id} completed: {e}");
            return;
        }

        self.metrics.record_batch_completed();
        info!("batch {batch_id} completed");
    }
}
