use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        requestdtos::{
            CreateReviewDto, CreateServiceRequestDto, RequestListQueryDto, UpdateServiceRequestDto,
        },
        userdtos::{IdentityDto, UpdateProfileDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddleware, RoutePolicy},
    models::usermodel::UserRole,
    AppState,
};

pub fn customer_handler() -> Router {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route(
            "/service-requests",
            get(get_service_requests).post(create_service_request),
        )
        .route(
            "/service-requests/:id",
            get(get_service_request).put(update_service_request),
        )
        .route(
            "/service-requests/:id/review",
            get(get_review).post(create_review),
        )
        .route("/service-stats", get(get_service_stats))
        .route("/service-history", get(get_service_history))
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, RoutePolicy::only(&[UserRole::Customer]))
        }))
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

pub async fn get_service_requests(
    Query(query): Query<RequestListQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let requests = app_state
        .request_service
        .customer_requests(user.claims.sub, query.status)
        .await?;
    Ok(Json(ApiResponse::success("Service requests", requests)))
}

pub async fn create_service_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateServiceRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let request = app_state
        .request_service
        .create(user.claims.sub, body)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Service request created", request)),
    ))
}

pub async fn get_service_request(
    Path(request_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state
        .request_service
        .customer_request(user.claims.sub, request_id)
        .await?;
    Ok(Json(ApiResponse::success("Service request", request)))
}

/// Cancel, complete and revert move the status; `edit` changes fields of an open request.
pub async fn update_service_request(
    Path(request_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateServiceRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let requests = &app_state.request_service;
    let request = match body.transition() {
        Some(action) => {
            requests
                .customer_action(user.claims.sub, request_id, action)
                .await?
        }
        None => requests.edit(user.claims.sub, request_id, body.edit()).await?,
    };
    Ok(Json(ApiResponse::success("Service request updated", request)))
}

pub async fn get_review(
    Path(request_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let review = app_state
        .review_service
        .review_for_request(user.claims.sub, request_id)
        .await?;
    Ok(Json(ApiResponse::success("Review", review)))
}

pub async fn create_review(
    Path(request_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let review = app_state
        .review_service
        .submit(user.claims.sub, request_id, body.rating, body.comment)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Thank you for your review", review)),
    ))
}

pub async fn get_service_stats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state
        .report_service
        .customer_stats(user.claims.sub)
        .await?;
    Ok(Json(ApiResponse::success("Service statistics", stats)))
}

pub async fn get_service_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let history = app_state.request_service.history(user.claims.sub).await?;
    Ok(Json(ApiResponse::success("Service history", history)))
}
