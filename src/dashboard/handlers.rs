use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, instrument};

use crate::{auth::extractors::AuthUser, receipts::handlers::internal, state::AppState};

use super::dto::{ChartPoint, DateRange, KpiData, TopItemsQuery};
use super::repo;

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/kpis", get(get_kpis))
        .route("/dashboard/time-series", get(get_time_series))
        .route("/dashboard/chart-data", get(get_chart_data))
        .route("/dashboard/top-items", get(get_top_items))
}

#[instrument(skip(state))]
pub async fn get_kpis(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(range): Query<DateRange>,
) -> Result<Json<KpiData>, (StatusCode, String)> {
    range.validate().map_err(bad_request)?;
    repo::kpis(&state.db, user_id, range)
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, %user_id, "kpis failed");
            internal(e)
        })
}

#[instrument(skip(state))]
pub async fn get_time_series(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(range): Query<DateRange>,
) -> Result<Json<Vec<ChartPoint>>, (StatusCode, String)> {
    range.validate().map_err(bad_request)?;
    repo::spending_over_time(&state.db, user_id, range)
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, %user_id, "time series failed");
            internal(e)
        })
}

#[instrument(skip(state))]
pub async fn get_chart_data(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(range): Query<DateRange>,
) -> Result<Json<Vec<ChartPoint>>, (StatusCode, String)> {
    range.validate().map_err(bad_request)?;
    repo::spending_by_category(&state.db, user_id, range)
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, %user_id, "chart data failed");
            internal(e)
        })
}

#[instrument(skip(state))]
pub async fn get_top_items(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<TopItemsQuery>,
) -> Result<Json<Vec<ChartPoint>>, (StatusCode, String)> {
    let range = q.range();
    range.validate().map_err(bad_request)?;
    repo::top_items(&state.db, user_id, range, q.limit())
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, %user_id, "top items failed");
            internal(e)
        })
}

fn bad_request(msg: String) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, msg)
}
