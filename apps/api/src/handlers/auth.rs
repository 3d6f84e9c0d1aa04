//! Sign-up, login and the current session.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tillbook_core::tenant::ShopRegistration;
use tillbook_core::SessionUser;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, AuthContext};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub token: String,
    pub user: SessionUser,
}

/// `POST /api/auth/signup`
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(registration): ApiJson<ShopRegistration>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    registration.validate()?;

    let password_hash = hash_password(&registration.password)?;
    let (shop, owner) = state
        .db
        .shops()
        .register(&registration, &password_hash, state.config.signup_demo_default, Utc::now())
        .await?;

    let token = state
        .jwt
        .issue(&owner.id, Some(&shop.id), &owner.email, owner.role)?;

    info!(shop_id = %shop.id, is_demo = shop.is_demo, "New shop signed up");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Shop created successfully",
            token,
            user: SessionUser::new(&owner, &shop),
        }),
    ))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = match state.db.users().find_by_email(&request.email).await? {
        Some(user) => user,
        None => return Err(ApiError::unauthorized(INVALID_CREDENTIALS)),
    };

    if !verify_password(&request.password, &user.password_hash) {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let shop = state.db.shops().get(&user.shop_id).await?;
    let token = state.jwt.issue(&user.id, Some(&shop.id), &user.email, user.role)?;

    info!(user_id = %user.id, shop_id = %shop.id, "User logged in");

    Ok(Json(AuthResponse {
        message: "Login successful",
        token,
        user: SessionUser::new(&user, &shop),
    }))
}

/// `GET /api/auth/me`
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<SessionUser>> {
    let user = state
        .db
        .users()
        .find_by_id(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let shop = state.db.shops().get(&auth.shop_id).await?;
    Ok(Json(SessionUser::new(&user, &shop)))
}
