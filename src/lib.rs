// Library exports for the scan-translation batch backend

pub mod api;
pub mod core;
pub mod inference;
pub mod notify;
pub mod pipeline;
pub mod rendering;
pub mod store;
pub mod utils;

// Re-export commonly used types and functions
pub use core::{
    config::Config,
    errors::{ConfigError, PageError, StoreError},
    types::{
        BatchRecord, BatchStatus, NormalizedBox, PageRecord, PageStatus, PixelBox,
        TranslatedPageRecord, UserRecord,
    },
};

pub use inference::{clamp_region, map_boxes, to_pixel_box, RegionTransformer};
pub use notify::NotificationHub;
pub use pipeline::{
    batch_orchestrator::BatchOrchestrator, page_processor::PageProcessor,
    status::derive_batch_status,
};
pub use rendering::TextRenderer;
pub use store::{memory::MemoryStore, BatchStore};
pub use utils::Metrics;
