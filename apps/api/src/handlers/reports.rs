//! Dashboard and report endpoints.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Local;
use serde::Deserialize;
use tillbook_core::report::{DashboardStats, DateWindow, TopProduct};
use tracing::error;

use crate::auth::AuthContext;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// `GET /api/reports/dashboard`
///
/// Always answers 200. Failures are logged and served as a zeroed payload.
pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(range): Query<RangeQuery>,
) -> Json<DashboardStats> {
    let now = Local::now();
    let window = DateWindow::resolve(range.start_date.as_deref(), range.end_date.as_deref(), &now);

    match state.db.reports().dashboard(&auth.shop_id, window, &now).await {
        Ok(stats) => Json(stats),
        Err(e) => {
            error!(shop_id = %auth.shop_id, error = %e, "Dashboard aggregation failed");
            Json(DashboardStats::empty())
        }
    }
}

/// `GET /api/reports/top-products`: windowed only when both dates parse.
pub async fn top_products(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<Vec<TopProduct>>> {
    let window = DateWindow::explicit(range.start_date.as_deref(), range.end_date.as_deref(), &Local);
    Ok(Json(state.db.reports().top_products(&auth.shop_id, window).await?))
}
