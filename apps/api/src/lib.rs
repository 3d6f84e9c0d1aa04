//! # Tillbook API
//!
//! JSON REST server for the Tillbook retail backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           API Routes                                    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  /api/auth     │  │  /api/products │  │  /api/invoices             ││
//! │  │                │  │                │  │                            ││
//! │  │ • signup       │  │ • CRUD         │  │ • checkout (POST)          ││
//! │  │ • login        │  │ • bulk import  │  │ • list                     ││
//! │  │ • me           │  │ • quick edit   │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │ /api/suppliers │  │ /api/purchases │  │  /api/settings             ││
//! │  │ /api/reports   │  │ • receive      │  │ • reset / delete account   ││
//! │  │                │  │ • cancel       │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │  SQLite      │  │  JWT Auth    │  │  TraceLayer + CORS       ││  │
//! │  │  │  (tillbook-  │  │  AuthContext │  │  optional static client  ││  │
//! │  │  │   db)        │  │  extractor   │  │                          ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::ApiConfig`]; every value comes from an environment variable.

pub mod auth;
pub mod config;
pub mod demo;
pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::Router;
use tillbook_db::Database;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

// Re-exports
pub use auth::{AuthContext, JwtManager};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use extract::ApiJson;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_lifetime_secs);
        AppState {
            db,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
        }
    }
}

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let quota = from_fn_with_state(state.clone(), demo::product_quota);

    let products = Router::new()
        .route(
            "/",
            post(handlers::products::create)
                .route_layer(quota.clone())
                .get(handlers::products::list),
        )
        .route(
            "/bulk",
            post(handlers::products::bulk_create)
                .route_layer(quota)
                .put(handlers::products::bulk_update),
        )
        .route(
            "/{id}",
            get(handlers::products::get)
                .put(handlers::products::update)
                .delete(handlers::products::remove),
        );

    let api = Router::new()
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/me", get(handlers::auth::me))
        .nest("/products", products)
        .route("/invoices", get(handlers::invoices::list).post(handlers::invoices::create))
        .route("/invoices/{id}", get(handlers::invoices::get))
        .route("/suppliers", get(handlers::suppliers::list).post(handlers::suppliers::create))
        .route(
            "/suppliers/{id}",
            get(handlers::suppliers::get)
                .put(handlers::suppliers::update)
                .delete(handlers::suppliers::remove),
        )
        .route("/purchases", get(handlers::purchases::list).post(handlers::purchases::create))
        .route("/purchases/{id}", get(handlers::purchases::get))
        .route("/purchases/{id}/receive", post(handlers::purchases::receive))
        .route("/purchases/{id}/cancel", post(handlers::purchases::cancel))
        .route("/settings", get(handlers::settings::get).put(handlers::settings::update))
        .route("/settings/reset", post(handlers::settings::reset))
        .route("/settings/account", delete(handlers::settings::delete_account))
        .route("/reports/dashboard", get(handlers::reports::dashboard))
        .route("/reports/top-products", get(handlers::reports::top_products));

    let mut router = Router::new()
        .route("/health", get(handlers::health::check))
        .nest("/api", api);

    if let Some(dir) = state.config.static_dir.as_ref() {
        let index = dir.join("index.html");
        router = router.fallback_service(ServeDir::new(dir).not_found_service(ServeFile::new(index)));
    }

    router
        .layer(from_fn_with_state(state.clone(), error::reveal_internal_details))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
