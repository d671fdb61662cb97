use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{dto::PublicUser, extractors::AdminUser, repo_types::User},
    receipts::{
        dto::{DetailResponse, ReceiptResponse},
        handlers::internal,
        repo as receipts_repo,
    },
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", delete(delete_user))
        .route("/admin/receipts", get(list_receipts))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<PublicUser>>, (StatusCode, String)> {
    let users = User::list_all(&state.db).await.map_err(|e| {
        error!(error = %e, "list users failed");
        internal(e)
    })?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn list_receipts(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<ReceiptResponse>>, (StatusCode, String)> {
    let receipts = receipts_repo::list_all(&state.db).await.map_err(|e| {
        error!(error = %e, "list all receipts failed");
        internal(e)
    })?;
    Ok(Json(receipts.into_iter().map(ReceiptResponse::from).collect()))
}

/// Removes a user together with their receipts and items.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DetailResponse>, (StatusCode, String)> {
    if admin.id == id {
        warn!(%id, "admin tried to delete own account");
        return Err((
            StatusCode::BAD_REQUEST,
            "Admin cannot delete their own account.".into(),
        ));
    }

    let deleted = User::delete(&state.db, id).await.map_err(|e| {
        error!(error = %e, %id, "delete user failed");
        internal(e)
    })?;
    if !deleted {
        return Err((StatusCode::NOT_FOUND, "User not found".into()));
    }

    info!(%id, "user deleted by admin");
    Ok(Json(DetailResponse {
        detail: "User and all their data deleted successfully",
    }))
}
