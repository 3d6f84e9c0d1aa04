//! Demo-shop product quota.
//!
//! Runs in front of product creation only. Invoice quotas are enforced
//! inside the checkout transaction instead, so they cannot race.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Local;
use tillbook_core::report::start_of_day;
use tillbook_core::CoreError;
use tracing::{debug, warn};

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::AppState;

/// Rejects product creation once a demo shop has created its daily
/// allowance. Lookup failures let the request through.
pub async fn product_quota(
    State(state): State<AppState>,
    auth: AuthContext,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.config.is_demo_exempt(&auth.email) {
        return Ok(next.run(request).await);
    }

    let shop = match state.db.shops().get(&auth.shop_id).await {
        Ok(shop) => shop,
        Err(e) => {
            warn!(shop_id = %auth.shop_id, error = %e, "Quota check skipped: shop lookup failed");
            return Ok(next.run(request).await);
        }
    };

    if !shop.is_demo {
        return Ok(next.run(request).await);
    }

    let since = start_of_day(&Local::now());
    let created = match state.db.products().count_created_since(&shop.id, since).await {
        Ok(count) => count,
        Err(e) => {
            warn!(shop_id = %shop.id, error = %e, "Quota check skipped: count failed");
            return Ok(next.run(request).await);
        }
    };

    let limit = state.config.demo_products_per_day;
    if created >= limit {
        debug!(shop_id = %shop.id, created, limit, "Demo product quota reached");
        return Err(CoreError::DemoLimitExceeded {
            resource: "products".to_string(),
            limit,
        }
        .into());
    }

    Ok(next.run(request).await)
}
