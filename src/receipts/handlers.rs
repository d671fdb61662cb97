use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{auth::extractors::AuthUser, state::AppState};

use super::dto::{DetailResponse, Pagination, ReceiptResponse};
use super::repo;
use super::services::{process_upload, UploadItem};

// --- public routers ---

pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/receipts", get(list_recent_receipts))
        .route("/receipts/all", get(list_all_receipts))
        .route("/receipts/:id", get(get_receipt).delete(delete_receipt))
}

pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/receipts", post(upload_receipt)) // multipart field `file`
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_recent_receipts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<ReceiptResponse>>, (StatusCode, String)> {
    let (limit, offset) = p.clamped();
    let receipts = repo::list_by_owner(&state.db, user_id, Some(limit), offset)
        .await
        .map_err(internal)?;
    Ok(Json(receipts.into_iter().map(ReceiptResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn list_all_receipts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ReceiptResponse>>, (StatusCode, String)> {
    let receipts = repo::list_by_owner(&state.db, user_id, None, 0)
        .await
        .map_err(internal)?;
    Ok(Json(receipts.into_iter().map(ReceiptResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_receipt(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReceiptResponse>, (StatusCode, String)> {
    match repo::get_for_owner(&state.db, id, user_id).await {
        Ok(Some(r)) => Ok(Json(r.into())),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Receipt not found".into())),
        Err(e) => {
            error!(error = %e, %user_id, %id, "get_receipt failed");
            Err(internal(e))
        }
    }
}

/// POST /receipts (multipart), field `file`
#[instrument(skip(state, mp))]
pub async fn upload_receipt(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<ReceiptResponse>), (StatusCode, String)> {
    let mut file = None;
    loop {
        let field = match mp.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "malformed multipart body");
                return Err((StatusCode::BAD_REQUEST, e.body_text()));
            }
        };
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.body_text()))?;
        file = Some((content_type, data));
        break;
    }

    let Some((content_type, body)) = file else {
        return Err((StatusCode::BAD_REQUEST, "file is required".into()));
    };
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "file is empty".into()));
    }
    info!(%user_id, bytes = body.len(), %content_type, "receipt upload received");

    let saved = process_upload(
        &state,
        user_id,
        UploadItem {
            body,
            content_type: &content_type,
        },
    )
    .await
    .map_err(<(StatusCode, String)>::from)?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/receipts/{}", saved.receipt.id)) {
        headers.insert(axum::http::header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, Json(saved.into())))
}

#[instrument(skip(state))]
pub async fn delete_receipt(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DetailResponse>, (StatusCode, String)> {
    let deleted = repo::delete_for_owner(&state.db, id, user_id)
        .await
        .map_err(internal)?;
    if !deleted {
        warn!(%user_id, %id, "delete of missing or foreign receipt");
        return Err((StatusCode::NOT_FOUND, "Receipt not found".into()));
    }
    info!(%user_id, %id, "receipt deleted");
    Ok(Json(DetailResponse {
        detail: "Receipt deleted successfully",
    }))
}

pub(crate) fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
