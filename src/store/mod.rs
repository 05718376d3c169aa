// Store boundary: durable keyed storage for users, batches, pages and
// completed translations.
//
// The pipeline only needs get-by-id, get-by-secondary-index, insert and
// field-level update; no transactions beyond single-document atomicity
// (batch creation with its pages is the one multi-record insert and is
// atomic with respect to visibility).

pub mod memory;

use async_trait::async_trait;

use crate::core::errors::StoreResult;
use crate::core::types::{BatchRecord, PageRecord, TranslatedPageRecord, UserRecord};

#[async_trait]
pub trait BatchStore: Send + Sync {
    // Users (unique key: pseudo)
    async fn get_user_by_pseudo(&self, pseudo: &str) -> StoreResult<Option<UserRecord>>;
    async fn insert_user(&self, user: UserRecord) -> StoreResult<()>;

    // Batches (key: batch id, secondary index: user id)
    /// Insert a batch together with all of its pages in one logical step.
    /// A partially created batch must never be observable.
    async fn insert_batch(&self, batch: BatchRecord, pages: Vec<PageRecord>) -> StoreResult<()>;
    async fn get_batch(&self, batch_id: &str) -> StoreResult<Option<BatchRecord>>;
    async fn batches_for_user(&self, user_id: &str) -> StoreResult<Vec<BatchRecord>>;
    /// Terminal orchestration marker; does not imply page success.
    async fn complete_batch(&self, batch_id: &str) -> StoreResult<()>;

    // Pages (key: page id, secondary index: batch id)
    async fn get_page(&self, page_id: &str) -> StoreResult<Option<PageRecord>>;
    async fn pages_for_batch(&self, batch_id: &str) -> StoreResult<Vec<PageRecord>>;
    async fn set_page_processing(&self, page_id: &str) -> StoreResult<()>;
    async fn complete_page(&self, page_id: &str, translated_image: Vec<u8>) -> StoreResult<()>;
    async fn fail_page(&self, page_id: &str, error_message: &str) -> StoreResult<()>;

    // Translated pages (append-only; secondary index: user id + batch id)
    async fn insert_translated_page(&self, record: TranslatedPageRecord) -> StoreResult<()>;
    /// History for a user, newest completion first.
    async fn translated_pages_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<TranslatedPageRecord>>;
    /// Pages of one batch, oldest completion first.
    async fn translated_pages_for_batch(
        &self,
        user_id: &str,
        batch_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<TranslatedPageRecord>>;
}
