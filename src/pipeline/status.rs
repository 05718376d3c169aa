// Batch status aggregation.
//
// Pure function, recomputed on every batch read; page state changes
// asynchronously relative to reads, so the result is never cached.

use crate::core::types::{BatchStatus, PageStatus};

/// Derive a batch's status from its pages' statuses.
///
/// - no pages: fall back to the batch's own stored status
/// - all pages done: done
/// - any page processing or done (but not all done): processing
/// - otherwise (pending, possibly mixed with error): pending
///
/// Errors alone never promote the status; an error-only page set
/// aggregates to pending.
pub fn derive_batch_status(page_statuses: &[PageStatus], stored: BatchStatus) -> BatchStatus {
    if page_statuses.is_empty() {
        return stored;
    }

    if page_statuses.iter().all(|s| *s == PageStatus::Done) {
        return BatchStatus::Done;
    }

    if page_statuses
        .iter()
        .any(|s| matches!(s, PageStatus::Processing | PageStatus::Done))
    {
        return BatchStatus::Processing;
    }

    BatchStatus::Pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageStatus::*;

    #[test]
    fn empty_batch_falls_back_to_stored_status() {
        assert_eq!(
            derive_batch_status(&[], BatchStatus::Completed),
            BatchStatus::Completed
        );
        assert_eq!(
            derive_batch_status(&[], BatchStatus::Pending),
            BatchStatus::Pending
        );
    }

    #[test]
    fn all_done_is_done() {
        assert_eq!(
            derive_batch_status(&[Done, Done, Done], BatchStatus::Pending),
            BatchStatus::Done
        );
    }

    #[test]
    fn partial_progress_is_processing() {
        assert_eq!(
            derive_batch_status(&[Pending, Processing], BatchStatus::Pending),
            BatchStatus::Processing
        );
        assert_eq!(
            derive_batch_status(&[Done, Pending], BatchStatus::Pending),
            BatchStatus::Processing
        );
        assert_eq!(
            derive_batch_status(&[Done, Error], BatchStatus::Pending),
            BatchStatus::Processing
        );
    }

    #[test]
    fn all_pending_is_pending() {
        assert_eq!(
            derive_batch_status(&[Pending, Pending], BatchStatus::Completed),
            BatchStatus::Pending
        );
    }

    #[test]
    fn errors_alone_never_promote() {
        // Errors mixed with pending stay pending
        assert_eq!(
            derive_batch_status(&[Error, Pending, Pending], BatchStatus::Completed),
            BatchStatus::Pending
        );
        // Even an error-only set aggregates to pending
        assert_eq!(
            derive_batch_status(&[Error, Error], BatchStatus::Completed),
            BatchStatus::Pending
        );
    }

    #[test]
    fn derivation_is_idempotent() {
        let statuses = [Done, Processing, Error, Pending];
        let first = derive_batch_status(&statuses, BatchStatus::Pending);
        let second = derive_batch_status(&statuses, BatchStatus::Pending);
        assert_eq!(first, second);
    }
}
