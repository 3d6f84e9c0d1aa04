//! Supplier endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tillbook_core::catalog::{NewSupplier, SupplierPatch};
use tillbook_core::Supplier;

use super::MessageResponse;
use crate::auth::AuthContext;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;

pub async fn list(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<Vec<Supplier>>> {
    Ok(Json(state.db.suppliers().list(&auth.shop_id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Supplier>> {
    Ok(Json(state.db.suppliers().get(&auth.shop_id, &id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(new): ApiJson<NewSupplier>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    let supplier = state.db.suppliers().create(&auth.shop_id, &new, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<SupplierPatch>,
) -> ApiResult<Json<Supplier>> {
    let supplier = state
        .db
        .suppliers()
        .update(&auth.shop_id, &id, &patch, Utc::now())
        .await?;
    Ok(Json(supplier))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.db.suppliers().delete(&auth.shop_id, &id).await?;
    Ok(Json(MessageResponse::new("Supplier deleted")))
}
