// Batch/page processing pipeline: the page lifecycle state machine, the
// orchestration driving pages through it, and batch status aggregation.

pub mod batch_orchestrator;
pub mod page_processor;
pub mod status;
