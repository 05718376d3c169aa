// HTTP and WebSocket surface.
//
// Handlers answer (StatusCode, String) on failure; the upload handler
// returns as soon as batch and page records are durably created, with
// orchestration running as a detached task.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose, Engine};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::config::Config;
use crate::core::errors::StoreError;
use crate::core::types::{
    BatchRecord, BatchResultResponse, BatchStatus, BatchSummary, LoginRequest, LoginResponse,
    PageDetail, PageRecord, PageStatus, TranslatedPageSummary, TranslatedPagesResponse,
    UploadBatchRequest, UploadBatchResponse, UserBatchesResponse, UserRecord,
};
use crate::notify::NotificationHub;
use crate::pipeline::batch_orchestrator::BatchOrchestrator;
use crate::pipeline::status::derive_batch_status;
use crate::store::BatchStore;
use crate::utils::Metrics;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn BatchStore>,
    pub orchestrator: Arc<BatchOrchestrator>,
    pub hub: NotificationHub,
    pub metrics: Metrics,
}

type ApiError = (StatusCode, String);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/auth/login", post(login))
        .route("/upload-batch", post(upload_batch))
        .route("/result/{batch_id}", get(batch_result))
        .route("/user/{pseudo}/batches", get(user_batches))
        .route("/user/{pseudo}/translated-pages", get(user_translated_pages))
        .route("/batch/{batch_id}/translated-pages", get(batch_translated_pages))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn root() -> &'static str {
    "Scan Translation Backend"
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn stats(State(state): State<AppState>) -> Json<crate::utils::metrics::MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Reject pseudos shorter than 2 characters after trimming.
fn validate_pseudo(pseudo: &str) -> Result<String, ApiError> {
    let trimmed = pseudo.trim();
    if trimmed.len() < 2 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Pseudo must be at least 2 characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn pseudo_header(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("X-User-Pseudo")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            "User pseudo required in X-User-Pseudo header".to_string(),
        ))
}

fn internal(err: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{err}"))
}

/// Fetch the user for a pseudo, creating it on first sight.
async fn get_or_create_user(
    store: &dyn BatchStore,
    pseudo: &str,
) -> Result<UserRecord, StoreError> {
    if let Some(user) = store.get_user_by_pseudo(pseudo).await? {
        return Ok(user);
    }

    let user = UserRecord {
        user_id: Uuid::new_v4().to_string(),
        pseudo: pseudo.to_string(),
        created_at: Utc::now(),
    };

    match store.insert_user(user.clone()).await {
        Ok(()) => Ok(user),
        // Lost a creation race; the winner's record is the user
        Err(StoreError::Duplicate { .. }) => store
            .get_user_by_pseudo(pseudo)
            .await?
            .ok_or_else(|| StoreError::not_found("user", pseudo)),
        Err(e) => Err(e),
    }
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let pseudo = validate_pseudo(&request.pseudo)?;
    let user = get_or_create_user(state.store.as_ref(), &pseudo)
        .await
        .map_err(internal)?;

    Ok(Json(LoginResponse {
        pseudo: user.pseudo,
        message: "Login successful".to_string(),
    }))
}

async fn upload_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UploadBatchRequest>,
) -> Result<Json<UploadBatchResponse>, ApiError> {
    let pseudo = validate_pseudo(&pseudo_header(&headers)?)?;

    if request.pages.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No pages provided".to_string()));
    }

    let user = get_or_create_user(state.store.as_ref(), &pseudo)
        .await
        .map_err(internal)?;

    let batch_id = Uuid::new_v4().to_string();
    let mut pages = Vec::with_capacity(request.pages.len());
    let mut page_ids = Vec::with_capacity(request.pages.len());

    for upload in &request.pages {
        let payload = general_purpose::STANDARD
            .decode(&upload.image_base64)
            .map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("Invalid base64 payload for {}: {e}", upload.filename),
                )
            })?;

        let page_id = Uuid::new_v4().to_string();
        page_ids.push(page_id.clone());
        pages.push(PageRecord {
            page_id,
            batch_id: batch_id.clone(),
            filename: upload.filename.clone(),
            status: PageStatus::Pending,
            original_image: Arc::new(payload),
            translated_image: None,
            error_message: None,
        });
    }

    let batch = BatchRecord {
        batch_id: batch_id.clone(),
        user_id: user.user_id,
        page_ids,
        status: BatchStatus::Pending,
        created_at: Utc::now(),
    };

    // Batch and pages become visible together; the response is only sent
    // once they are durably created.
    state
        .store
        .insert_batch(batch, pages)
        .await
        .map_err(internal)?;

    state.metrics.record_batch_submitted();
    info!("accepted batch {batch_id} with {} page(s)", request.pages.len());

    // Detached orchestration; the client polls or listens on /ws.
    let orchestrator = Arc::clone(&state.orchestrator);
    let spawned_batch_id = batch_id.clone();
    tokio::spawn(async move {
        orchestrator.run_batch(&spawned_batch_id).await;
    });

    Ok(Json(UploadBatchResponse { batch_id }))
}

fn page_detail(page: &PageRecord) -> PageDetail {
    PageDetail {
        page_id: page.page_id.clone(),
        batch_id: page.batch_id.clone(),
        filename: page.filename.clone(),
        status: page.status,
        original_url: format!(
            "data:image/jpeg;base64,{}",
            general_purpose::STANDARD.encode(page.original_image.as_ref())
        ),
        translated_url: page.translated_image.as_ref().map(|bytes| {
            format!(
                "data:image/png;base64,{}",
                general_purpose::STANDARD.encode(bytes.as_ref())
            )
        }),
        error_message: page.error_message.clone(),
    }
}

fn summarize_batch(batch: &BatchRecord, pages: &[PageRecord]) -> BatchSummary {
    let statuses: Vec<PageStatus> = pages.iter().map(|p| p.status).collect();

    BatchSummary {
        id: batch.batch_id.clone(),
        user_id: batch.user_id.clone(),
        page_ids: batch.page_ids.clone(),
        created_at: batch.created_at,
        status: derive_batch_status(&statuses, batch.status),
    }
}

async fn batch_result(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<BatchResultResponse>, ApiError> {
    let pseudo = pseudo_header(&headers)?;

    let user = state
        .store
        .get_user_by_pseudo(&pseudo)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    let batch = state
        .store
        .get_batch(&batch_id)
        .await
        .map_err(internal)?
        .filter(|b| b.user_id == user.user_id)
        .ok_or((StatusCode::NOT_FOUND, "Batch not found".to_string()))?;

    let pages = state
        .store
        .pages_for_batch(&batch_id)
        .await
        .map_err(internal)?;

    Ok(Json(BatchResultResponse {
        batch: summarize_batch(&batch, &pages),
        pages: pages.iter().map(page_detail).collect(),
    }))
}

async fn user_batches(
    State(state): State<AppState>,
    Path(pseudo): Path<String>,
) -> Result<Json<UserBatchesResponse>, ApiError> {
    let user = state
        .store
        .get_user_by_pseudo(&pseudo)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    let records = state
        .store
        .batches_for_user(&user.user_id)
        .await
        .map_err(internal)?;

    let mut batches = Vec::with_capacity(records.len());
    for batch in &records {
        let pages = state
            .store
            .pages_for_batch(&batch.batch_id)
            .await
            .map_err(internal)?;
        batches.push(summarize_batch(batch, &pages));
    }

    Ok(Json(UserBatchesResponse { batches }))
}

fn translated_summary(record: &crate::core::types::TranslatedPageRecord) -> TranslatedPageSummary {
    TranslatedPageSummary {
        id: record.id.clone(),
        page_id: record.page_id.clone(),
        batch_id: record.batch_id.clone(),
        filename: record.filename.clone(),
        original_url: format!(
            "data:image/jpeg;base64,{}",
            general_purpose::STANDARD.encode(record.original_image.as_ref())
        ),
        translated_url: format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(record.translated_image.as_ref())
        ),
        completed_at: record.completed_at,
    }
}

async fn user_translated_pages(
    State(state): State<AppState>,
    Path(pseudo): Path<String>,
) -> Result<Json<TranslatedPagesResponse>, ApiError> {
    let user = state
        .store
        .get_user_by_pseudo(&pseudo)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    let records = state
        .store
        .translated_pages_for_user(&user.user_id, state.config.history_limit())
        .await
        .map_err(internal)?;

    Ok(Json(TranslatedPagesResponse {
        translated_pages: records.iter().map(translated_summary).collect(),
    }))
}

async fn batch_translated_pages(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TranslatedPagesResponse>, ApiError> {
    let pseudo = pseudo_header(&headers)?;

    let user = state
        .store
        .get_user_by_pseudo(&pseudo)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    let records = state
        .store
        .translated_pages_for_batch(&user.user_id, &batch_id, state.config.history_limit())
        .await
        .map_err(internal)?;

    Ok(Json(TranslatedPagesResponse {
        translated_pages: records.iter().map(translated_summary).collect(),
    }))
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// One subscriber connection: forward hub broadcasts out, echo incoming
/// text back through the hub as a liveness round trip.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (subscriber_id, mut rx) = state.hub.subscribe();

    state.metrics.ws_connected();
    info!("WebSocket client connected");

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sender.send(Message::Text(message.into())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                state.hub.broadcast(&format!("Echo: {text}"));
                state.metrics.record_broadcast();
            }
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {e}");
                break;
            }
        }
    }

    send_task.abort();
    state.hub.unsubscribe(subscriber_id);
    state.metrics.ws_disconnected();
    info!("WebSocket client disconnected");
}
