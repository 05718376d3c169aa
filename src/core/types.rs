// Data model for the batch/page pipeline, plus the API request/response shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lifecycle state of a single page.
///
/// Transitions are monotonic: pending → processing → {done | error}.
/// The store rejects any regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl PageStatus {
    /// Whether moving from `self` to `next` goes forward in the lifecycle.
    pub fn can_transition_to(self, next: PageStatus) -> bool {
        matches!(
            (self, next),
            (PageStatus::Pending, PageStatus::Processing)
                | (PageStatus::Processing, PageStatus::Done)
                | (PageStatus::Processing, PageStatus::Error)
        )
    }
}

/// Batch status as stored, or as derived from page statuses on read.
///
/// `Completed` is only ever stored: it marks that orchestration finished
/// iterating, not that every page succeeded. Readers receive the derived
/// status unless the batch has no pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Processing,
    Done,
    Completed,
}

/// One page of a submitted batch.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub page_id: String,
    pub batch_id: String,
    pub filename: String,
    pub status: PageStatus,
    /// Opaque encoded image payload as uploaded.
    pub original_image: Arc<Vec<u8>>,
    /// Present iff status == Done.
    pub translated_image: Option<Arc<Vec<u8>>>,
    /// Present iff status == Error.
    pub error_message: Option<String>,
}

/// A user-submitted group of pages, tracked together.
#[derive(Debug, Clone)]
pub struct BatchRecord {
    pub batch_id: String,
    pub user_id: String,
    /// Submission order; significant for display only.
    pub page_ids: Vec<String>,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
}

/// Append-only record written once per page that reaches `done`.
#[derive(Debug, Clone)]
pub struct TranslatedPageRecord {
    pub id: String,
    pub page_id: String,
    pub user_id: String,
    pub batch_id: String,
    pub filename: String,
    pub original_image: Arc<Vec<u8>>,
    pub translated_image: Arc<Vec<u8>>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: String,
    pub pseudo: String,
    pub created_at: DateTime<Utc>,
}

/// Detected region in normalized YOLO form: (center-x, center-y, width,
/// height), all in [0, 1] relative to the image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

/// Absolute pixel bounds (left, top, right, bottom), clamped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelBox {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

// --- API shapes ---

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub pseudo: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub pseudo: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PageUpload {
    pub filename: String,
    pub image_base64: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadBatchRequest {
    pub pages: Vec<PageUpload>,
}

#[derive(Debug, Serialize)]
pub struct UploadBatchResponse {
    #[serde(rename = "batchId")]
    pub batch_id: String,
}

/// Batch as reported to clients. `status` is derived on every read.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub id: String,
    pub user_id: String,
    pub page_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub status: BatchStatus,
}

#[derive(Debug, Serialize)]
pub struct PageDetail {
    pub page_id: String,
    pub batch_id: String,
    pub filename: String,
    pub status: PageStatus,
    pub original_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResultResponse {
    pub batch: BatchSummary,
    pub pages: Vec<PageDetail>,
}

#[derive(Debug, Serialize)]
pub struct UserBatchesResponse {
    pub batches: Vec<BatchSummary>,
}

#[derive(Debug, Serialize)]
pub struct TranslatedPageSummary {
    pub id: String,
    pub page_id: String,
    pub batch_id: String,
    pub filename: String,
    pub original_url: String,
    pub translated_url: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TranslatedPagesResponse {
    pub translated_pages: Vec<TranslatedPageSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_status_only_moves_forward() {
        use PageStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Done));
        assert!(Processing.can_transition_to(Error));

        assert!(!Pending.can_transition_to(Done));
        assert!(!Done.can_transition_to(Pending));
        assert!(!Done.can_transition_to(Processing));
        assert!(!Error.can_transition_to(Processing));
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&PageStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(
            serde_json::to_string(&BatchStatus::Completed).unwrap(),
            "\"completed\""
        );
    }
}
