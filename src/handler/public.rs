use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::header,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        requestdtos::ReviewPageQueryDto, servicedtos::ServiceSearchQueryDto,
        userdtos::ProfessionalDto, ApiResponse,
    },
    error::HttpError,
    AppState,
};

/// Catalog browsing that needs no session.
pub fn public_handler() -> Router {
    Router::new()
        .route("/services", get(get_services))
        .route("/services/search", get(search_services))
        .route("/services/popular", get(get_popular_reviews))
        .route("/services/:id/image", get(get_service_image))
        .route("/services/:id/professionals", get(get_service_professionals))
        .route("/professionals/:id", get(get_professional))
        .route("/professionals/:id/reviews", get(get_professional_reviews))
}

pub async fn get_services(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let services = app_state.catalog_service.active().await?;
    Ok(Json(ApiResponse::success("Available services", services)))
}

pub async fn search_services(
    Query(query): Query<ServiceSearchQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let services = app_state
        .catalog_service
        .list(query.into_filter(false))
        .await?;
    Ok(Json(ApiResponse::success("Matching services", services)))
}

pub async fn get_popular_reviews(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let reviews = app_state.review_service.popular().await?;
    Ok(Json(ApiResponse::success("Popular reviews", reviews)))
}

pub async fn get_service_image(
    Path(service_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let image = app_state.catalog_service.image(service_id).await?;
    Ok(([(header::CONTENT_TYPE, image.content_type)], image.bytes))
}

pub async fn get_service_professionals(
    Path(service_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let professionals = app_state
        .catalog_service
        .professionals_for(service_id)
        .await?;
    let data: Vec<ProfessionalDto> = professionals.iter().map(ProfessionalDto::from).collect();
    Ok(Json(ApiResponse::success("Available professionals", data)))
}

pub async fn get_professional(
    Path(user_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let professional = app_state.catalog_service.professional(user_id).await?;
    Ok(Json(ApiResponse::success(
        "Professional",
        ProfessionalDto::from(&professional),
    )))
}

pub async fn get_professional_reviews(
    Path(user_id): Path<Uuid>,
    Query(query): Query<ReviewPageQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    // Hidden professionals stay hidden here too.
    app_state.catalog_service.professional(user_id).await?;

    let page = app_state
        .review_service
        .professional_reviews(user_id, query.page, query.per_page)
        .await?;
    Ok(Json(ApiResponse::success("Professional reviews", page)))
}
