use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, Query},
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use super::documents::{get_my_documents, upload_document};
use crate::{
    dtos::{
        requestdtos::{ProfessionalRequestActionDto, RequestListQueryDto},
        userdtos::{IdentityDto, UpdateProfileDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddleware, RoutePolicy},
    models::usermodel::UserRole,
    service::document_service::MAX_DOCUMENT_BYTES,
    AppState,
};

pub fn professional_handler() -> Router {
    Router::new()
        .route(
            "/profile",
            get(get_profile).put(update_profile).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, RoutePolicy::only(&[UserRole::Professional]))
            })),
        )
        .route(
            "/service-requests",
            get(get_service_requests).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, RoutePolicy::only(&[UserRole::Professional]))
            })),
        )
        .route(
            "/service-requests/:id",
            get(get_service_request)
                .put(update_service_request)
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(state, req, next, RoutePolicy::only(&[UserRole::Professional]))
                })),
        )
        .route(
            "/stats",
            get(get_stats).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, RoutePolicy::only(&[UserRole::Professional]))
            })),
        )
        .route(
            "/documents",
            get(get_my_documents)
                .post(upload_document)
                .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES + 64 * 1024))
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(
                        state,
                        req,
                        next,
                        RoutePolicy::only(&[UserRole::Professional]).allowing_pending(),
                    )
                })),
        )
        .route(
            "/status",
            get(get_status).layer(middleware::from_fn(|state, req, next| {
                role_check(
                    state,
                    req,
                    next,
                    RoutePolicy::only(&[UserRole::Professional]).allowing_pending(),
                )
            })),
        )
}

pub async fn get_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let identity = app_state.auth_service.identity(user.claims.sub).await?;
    Ok(Json(ApiResponse::success("Profile", IdentityDto::from(&identity))))
}

pub async fn update_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let identity = app_state
        .auth_service
        .update_profile(user.claims.sub, body.into())
        .await?;
    Ok(Json(ApiResponse::success(
        "Profile updated successfully",
        IdentityDto::from(&identity),
    )))
}

/// Requests assigned to the caller plus unclaimed ones for their service type.
pub async fn get_service_requests(
    Query(query): Query<RequestListQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let requests = app_state
        .request_service
        .professional_requests(user.claims.sub, query.status)
        .await?;
    Ok(Json(ApiResponse::success("Service requests", requests)))
}

pub async fn get_service_request(
    Path(request_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .request_service
        .professional_request(user.claims.sub, request_id)
        .await?;
    Ok(Json(ApiResponse::success("Service request", request)))
}

pub async fn update_service_request(
    Path(request_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<ProfessionalRequestActionDto>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .request_service
        .professional_action(user.claims.sub, request_id, body.transition())
        .await?;
    Ok(Json(ApiResponse::success("Service request updated", request)))
}

pub async fn get_stats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state
        .report_service
        .professional_stats(user.claims.sub)
        .await?;
    Ok(Json(ApiResponse::success("Professional statistics", stats)))
}

pub async fn get_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let status = app_state
        .approval_service
        .professional_status(user.claims.sub)
        .await?;
    Ok(Json(ApiResponse::success("Verification status", status)))
}
