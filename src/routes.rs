// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        admin::admin_handler, auth::auth_handler, customer::customer_handler,
        documents::documents_handler, professional::professional_handler, public::public_handler,
    },
    middleware::auth,
    AppState,
};

// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .merge(public_handler())
        .nest(
            "/customer",
            customer_handler()
                .layer(middleware::from_fn(auth))
        )
        .nest(
            "/professional",
            professional_handler()
                .layer(middleware::from_fn(auth))
        )
        .nest(
            "/admin",
            admin_handler()
                .layer(middleware::from_fn(auth))
        )
        .nest(
            "/documents",
            documents_handler()
                .layer(middleware::from_fn(auth))
        )
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
