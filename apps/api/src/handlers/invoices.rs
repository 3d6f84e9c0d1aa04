//! Invoice listing and checkout.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Local;
use tillbook_core::checkout::CheckoutRequest;
use tillbook_core::InvoiceDetail;
use tracing::info;

use crate::auth::AuthContext;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;

pub async fn list(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<Vec<InvoiceDetail>>> {
    let invoices = state.db.invoices().list(&auth.shop_id).await?;
    Ok(Json(invoices))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<InvoiceDetail>> {
    let invoice = state.db.invoices().get(&auth.shop_id, &id).await?;
    Ok(Json(invoice))
}

/// `POST /api/invoices`: the checkout transaction.
///
/// "Today" for the demo quota is the server's local day.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<InvoiceDetail>)> {
    let demo_daily_limit = if state.config.is_demo_exempt(&auth.email) {
        None
    } else {
        Some(state.config.demo_invoices_per_day)
    };

    let invoice = state
        .db
        .invoices()
        .checkout(&auth.shop_id, &request, demo_daily_limit, &Local::now())
        .await?;

    info!(
        shop_id = %auth.shop_id,
        invoice_number = %invoice.invoice.invoice_number,
        status = ?invoice.invoice.status,
        "Invoice created"
    );

    Ok((StatusCode::CREATED, Json(invoice)))
}
