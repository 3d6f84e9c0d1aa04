//! Shop settings, data resets and account deletion.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tillbook_core::tenant::{ResetScope, ShopSettingsPatch};
use tillbook_core::Shop;
use tracing::warn;

use super::MessageResponse;
use crate::auth::AuthContext;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(rename = "type", default)]
    pub scope: String,
}

pub async fn get(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<Shop>> {
    Ok(Json(state.db.shops().get(&auth.shop_id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(patch): ApiJson<ShopSettingsPatch>,
) -> ApiResult<Json<Shop>> {
    let shop = state
        .db
        .shops()
        .update_settings(&auth.shop_id, &patch, Utc::now())
        .await?;
    Ok(Json(shop))
}

/// `POST /api/settings/reset` with `{"type": "sales" | "all"}`.
pub async fn reset(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<ResetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let scope = ResetScope::parse(&request.scope)?;

    warn!(shop_id = %auth.shop_id, user_id = %auth.user_id, ?scope, "Shop data reset requested");
    state.db.shops().reset(&auth.shop_id, scope).await?;

    Ok(Json(MessageResponse::new(scope.completion_message())))
}

pub async fn delete_account(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<MessageResponse>> {
    warn!(shop_id = %auth.shop_id, user_id = %auth.user_id, "Account deletion requested");
    state.db.shops().delete_account(&auth.shop_id).await?;
    Ok(Json(MessageResponse::new("Account deleted")))
}
