// In-memory store implementation.
//
// All four collections live under a single RwLock so that batch+pages
// insertion is atomic with respect to readers. Page status updates
// enforce the monotonic lifecycle; a regression is a hard error rather
// than a silent overwrite.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::errors::{StoreError, StoreResult};
use crate::core::types::{
    BatchRecord, PageRecord, PageStatus, TranslatedPageRecord, UserRecord,
};
use crate::store::BatchStore;

#[derive(Default)]
struct Collections {
    users: HashMap<String, UserRecord>,
    batches: HashMap<String, BatchRecord>,
    pages: HashMap<String, PageRecord>,
    translated_pages: HashMap<String, TranslatedPageRecord>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn transition<'a>(
        collections: &'a mut Collections,
        page_id: &str,
        to: PageStatus,
    ) -> StoreResult<&'a mut PageRecord> {
        let page = collections
            .pages
            .get_mut(page_id)
            .ok_or_else(|| StoreError::not_found("page", page_id))?;

        if !page.status.can_transition_to(to) {
            return Err(StoreError::InvalidTransition {
                page_id: page_id.to_string(),
                from: page.status,
                to,
            });
        }

        page.status = to;
        Ok(page)
    }
}

#[async_trait]
impl BatchStore for MemoryStore {
    async fn get_user_by_pseudo(&self, pseudo: &str) -> StoreResult<Option<UserRecord>> {
        let inner = self.inner.read();
        Ok(inner.users.values().find(|u| u.pseudo == pseudo).cloned())
    }

    async fn insert_user(&self, user: UserRecord) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.users.values().any(|u| u.pseudo == user.pseudo) {
            return Err(StoreError::Duplicate {
                kind: "user",
                id: user.pseudo,
            });
        }
        inner.users.insert(user.user_id.clone(), user);
        Ok(())
    }

    async fn insert_batch(&self, batch: BatchRecord, pages: Vec<PageRecord>) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.batches.contains_key(&batch.batch_id) {
            return Err(StoreError::Duplicate {
                kind: "batch",
                id: batch.batch_id,
            });
        }
        for page in pages {
            inner.pages.insert(page.page_id.clone(), page);
        }
        inner.batches.insert(batch.batch_id.clone(), batch);
        Ok(())
    }

    async fn get_batch(&self, batch_id: &str) -> StoreResult<Option<BatchRecord>> {
        Ok(self.inner.read().batches.get(batch_id).cloned())
    }

    async fn batches_for_user(&self, user_id: &str) -> StoreResult<Vec<BatchRecord>> {
        let inner = self.inner.read();
        let mut batches: Vec<BatchRecord> = inner
            .batches
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(batches)
    }

    async fn complete_batch(&self, batch_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let batch = inner
            .batches
            .get_mut(batch_id)
            .ok_or_else(|| StoreError::not_found("batch", batch_id))?;
        batch.status = crate::core::types::BatchStatus::Completed;
        Ok(())
    }

    async fn get_page(&self, page_id: &str) -> StoreResult<Option<PageRecord>> {
        Ok(self.inner.read().pages.get(page_id).cloned())
    }

    async fn pages_for_batch(&self, batch_id: &str) -> StoreResult<Vec<PageRecord>> {
        let inner = self.inner.read();
        // Preserve submission order via the batch's page id list
        let Some(batch) = inner.batches.get(batch_id) else {
            return Ok(Vec::new());
        };
        Ok(batch
            .page_ids
            .iter()
            .filter_map(|id| inner.pages.get(id).cloned())
            .collect())
    }

    async fn set_page_processing(&self, page_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        Self::transition(&mut inner, page_id, PageStatus::Processing)?;
        Ok(())
    }

    async fn complete_page(&self, page_id: &str, translated_image: Vec<u8>) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let page = Self::transition(&mut inner, page_id, PageStatus::Done)?;
        page.translated_image = Some(Arc::new(translated_image));
        page.error_message = None;
        Ok(())
    }

    async fn fail_page(&self, page_id: &str, error_message: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let page = Self::transition(&mut inner, page_id, PageStatus::Error)?;
        page.error_message = Some(error_message.to_string());
        Ok(())
    }

    async fn insert_translated_page(&self, record: TranslatedPageRecord) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.translated_pages.contains_key(&record.id) {
            return Err(StoreError::Duplicate {
                kind: "translated_page",
                id: record.id,
            });
        }
        inner.translated_pages.insert(record.id.clone(), record);
        Ok(())
    }

    async fn translated_pages_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<TranslatedPageRecord>> {
        let inner = self.inner.read();
        let mut records: Vec<TranslatedPageRecord> = inner
            .translated_pages
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn translated_pages_for_batch(
        &self,
        user_id: &str,
        batch_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<TranslatedPageRecord>> {
        let inner = self.inner.read();
        let mut records: Vec<TranslatedPageRecord> = inner
            .translated_pages
            .values()
            .filter(|t| t.user_id == user_id && t.batch_id == batch_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.completed_at.cmp(&b.completed_at));
        records.truncate(limit);
        Ok(records)
    }
}
