//! Purchase-order endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tillbook_core::purchase::NewPurchaseOrder;
use tillbook_core::PurchaseOrderDetail;

use crate::auth::AuthContext;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;

/// Response to a status transition.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    pub message: &'static str,
    pub purchase_order: PurchaseOrderDetail,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<PurchaseOrderDetail>>> {
    Ok(Json(state.db.purchases().list(&auth.shop_id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<PurchaseOrderDetail>> {
    Ok(Json(state.db.purchases().get(&auth.shop_id, &id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(order): ApiJson<NewPurchaseOrder>,
) -> ApiResult<(StatusCode, Json<PurchaseOrderDetail>)> {
    let created = state.db.purchases().create(&auth.shop_id, &order, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `POST /api/purchases/{id}/receive`: adds the ordered quantities to stock.
pub async fn receive(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<TransitionResponse>> {
    let order = state.db.purchases().receive(&auth.shop_id, &id, Utc::now()).await?;
    Ok(Json(TransitionResponse {
        message: "PO Received and Stock Updated",
        purchase_order: order,
    }))
}

pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<TransitionResponse>> {
    let order = state.db.purchases().cancel(&auth.shop_id, &id, Utc::now()).await?;
    Ok(Json(TransitionResponse {
        message: "PO Cancelled",
        purchase_order: order,
    }))
}
