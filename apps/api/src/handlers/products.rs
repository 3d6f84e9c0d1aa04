//! Product catalog endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Local, Utc};
use serde::Serialize;
use tillbook_core::catalog::{NewProduct, ProductPatch, ProductQuickEdit};
use tillbook_core::Product;

use super::MessageResponse;
use crate::auth::AuthContext;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateResponse {
    pub message: String,
    pub count: usize,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResponse {
    pub message: String,
    pub updated: u64,
}

pub async fn list(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<Vec<Product>>> {
    let products = state.db.products().list(&auth.shop_id).await?;
    Ok(Json(products))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let product = state.db.products().get(&auth.shop_id, &id).await?;
    Ok(Json(product))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(new): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.db.products().create(&auth.shop_id, &new, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `POST /api/products/bulk`: imports every row or none.
pub async fn bulk_create(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(rows): ApiJson<Vec<NewProduct>>,
) -> ApiResult<(StatusCode, Json<BulkCreateResponse>)> {
    let demo_daily_limit = if state.config.is_demo_exempt(&auth.email) {
        None
    } else {
        Some(state.config.demo_products_per_day)
    };
    let products = state
        .db
        .products()
        .bulk_create(&auth.shop_id, &rows, demo_daily_limit, &Local::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BulkCreateResponse {
            message: format!("{} products imported", products.len()),
            count: products.len(),
            products,
        }),
    ))
}

/// `PUT /api/products/bulk`: quick edit from the inventory grid.
pub async fn bulk_update(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(rows): ApiJson<Vec<ProductQuickEdit>>,
) -> ApiResult<Json<BulkUpdateResponse>> {
    let updated = state
        .db
        .products()
        .bulk_update(&auth.shop_id, &rows, Utc::now())
        .await?;

    Ok(Json(BulkUpdateResponse {
        message: format!("{} products updated", updated),
        updated,
    }))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ProductPatch>,
) -> ApiResult<Json<Product>> {
    let product = state
        .db
        .products()
        .update(&auth.shop_id, &id, &patch, Utc::now())
        .await?;
    Ok(Json(product))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.db.products().delete(&auth.shop_id, &id).await?;
    Ok(Json(MessageResponse::new("Product deleted")))
}
