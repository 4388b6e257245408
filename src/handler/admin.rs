use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request},
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        requestdtos::{ReviewPageQueryDto, RevenueQueryDto},
        servicedtos::{CreateServiceDto, ServiceSearchQueryDto, UpdateServiceDto},
        userdtos::{
            DocumentVerificationDto, FilterUserDto, ProfessionalDto, RejectUserDto,
            UserListQueryDto, VerifyDocumentDto,
        },
        ApiResponse, PaginatedResponse,
    },
    error::HttpError,
    middleware::{role_check, RoutePolicy},
    models::{reportmodel::Timeframe, usermodel::UserRole},
    service::{
        background_jobs::Job,
        catalog_service::{ServiceImage, MAX_IMAGE_BYTES},
    },
    AppState,
};

const DEFAULT_PAGE_SIZE: u32 = 20;

pub fn admin_handler() -> Router {
    Router::new()
        .route("/users", get(get_users))
        .route("/users/stats", get(get_user_stats))
        .route("/customers", get(get_customers))
        .route("/professionals", get(get_professionals))
        .route("/professionals/:id/status", get(get_professional_status))
        .route("/professionals/:id/reviews", get(get_professional_reviews))
        .route("/approve/:id", put(approve_user))
        .route("/reject/:id", put(reject_user))
        .route("/block/:id", put(block_user))
        .route("/unblock/:id", put(unblock_user))
        .route("/users/:id/documents", get(get_user_documents))
        .route("/documents/:id/verify", put(verify_document))
        .route(
            "/services",
            get(get_services)
                .post(create_service)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
        .route("/services/stats", get(get_service_stats))
        .route(
            "/services/:id",
            get(get_service)
                .put(update_service)
                .delete(delete_service)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
        .route("/analytics/revenue", get(get_revenue))
        .route("/analytics/revenue/:timeframe", get(get_revenue_for_timeframe))
        .route("/analytics/user-growth", get(get_user_growth))
        .route("/analytics/services-usage", get(get_services_usage))
        .route("/export-service-requests", post(export_service_requests))
        .route("/exports/:filename", get(download_export))
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, RoutePolicy::only(&[UserRole::Admin]))
        }))
}

async fn list_by_role(
    app_state: &AppState,
    role: Option<UserRole>,
    query: UserListQueryDto,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    let users = app_state
        .approval_service
        .list_users(role, query.search.as_deref(), page, limit)
        .await?;

    Ok(Json(PaginatedResponse::new(
        FilterUserDto::filter_users(&users.users),
        users.total,
        page,
        limit,
    )))
}

pub async fn get_users(
    Query(query): Query<UserListQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    list_by_role(&app_state, None, query).await
}

pub async fn get_customers(
    Query(query): Query<UserListQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    list_by_role(&app_state, Some(UserRole::Customer), query).await
}

/// Professionals with their profiles, so the review queue shows service type and verification.
pub async fn get_professionals(
    Query(query): Query<UserListQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    let (professionals, total) = app_state
        .approval_service
        .professionals(query.search.as_deref(), page, limit)
        .await?;

    Ok(Json(PaginatedResponse::new(
        professionals.iter().map(ProfessionalDto::from).collect(),
        total,
        page,
        limit,
    )))
}

pub async fn get_professional_status(
    Path(user_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let status = app_state
        .approval_service
        .professional_status(user_id)
        .await?;
    Ok(Json(ApiResponse::success("Verification status", status)))
}

pub async fn get_professional_reviews(
    Path(user_id): Path<Uuid>,
    Query(query): Query<ReviewPageQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = app_state
        .review_service
        .professional_reviews(user_id, query.page, query.per_page)
        .await?;
    Ok(Json(ApiResponse::success("Professional reviews", page)))
}

pub async fn approve_user(
    Path(user_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state.approval_service.approve(user_id).await?;
    Ok(Json(ApiResponse::success(
        "Professional approved",
        FilterUserDto::filter_user(&user),
    )))
}

pub async fn reject_user(
    Path(user_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    body: Option<Json<RejectUserDto>>,
) -> Result<impl IntoResponse, HttpError> {
    let reason = match body {
        Some(Json(body)) => {
            body.validate()
                .map_err(|e| HttpError::bad_request(e.to_string()))?;
            body.reason
        }
        None => None,
    };

    let user = app_state.approval_service.reject(user_id, reason).await?;
    Ok(Json(ApiResponse::success(
        "Professional rejected",
        FilterUserDto::filter_user(&user),
    )))
}

pub async fn block_user(
    Path(user_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state.approval_service.block(user_id).await?;
    Ok(Json(ApiResponse::success(
        "User blocked",
        FilterUserDto::filter_user(&user),
    )))
}

pub async fn unblock_user(
    Path(user_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state.approval_service.unblock(user_id).await?;
    Ok(Json(ApiResponse::success(
        "User unblocked",
        FilterUserDto::filter_user(&user),
    )))
}

pub async fn get_user_documents(
    Path(user_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let documents = app_state.document_service.list(user_id).await?;
    Ok(Json(ApiResponse::success("Documents", documents)))
}

pub async fn verify_document(
    Path(document_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<VerifyDocumentDto>,
) -> Result<impl IntoResponse, HttpError> {
    let (document, documents_verified) = app_state
        .document_service
        .set_verified(document_id, body.verified)
        .await?;
    Ok(Json(ApiResponse::success(
        "Document updated",
        DocumentVerificationDto {
            document,
            documents_verified,
        },
    )))
}

pub async fn get_services(
    Query(query): Query<ServiceSearchQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let services = app_state
        .catalog_service
        .list(query.into_filter(true))
        .await?;
    Ok(Json(ApiResponse::success("Services", services)))
}

fn form_value(name: &str, text: &str) -> Result<Value, HttpError> {
    let text = text.trim();
    match name {
        "base_price" => text
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| HttpError::bad_request("Invalid base price")),
        "avg_duration" => text
            .parse::<i32>()
            .map(Value::from)
            .map_err(|_| HttpError::bad_request("Invalid average duration")),
        _ => Ok(Value::String(text.to_string())),
    }
}

/// Reads a service body sent either as JSON or as a multipart form with an optional `image` part.
async fn service_form<T: DeserializeOwned>(
    request: Request,
) -> Result<(T, Option<ServiceImage>), HttpError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.starts_with("multipart/form-data"));

    if !is_multipart {
        let Json(body) = Json::<T>::from_request(request, &())
            .await
            .map_err(|e| HttpError::bad_request(e.body_text()))?;
        return Ok((body, None));
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| HttpError::bad_request(e.body_text()))?;
    let mut fields = serde_json::Map::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if name == "image" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| HttpError::bad_request(e.to_string()))?;
            // An empty part means no file was chosen.
            if !filename.is_empty() && !bytes.is_empty() {
                image = Some(ServiceImage {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }
        let text = field
            .text()
            .await
            .map_err(|e| HttpError::bad_request(e.to_string()))?;
        fields.insert(name.clone(), form_value(&name, &text)?);
    }

    let body = serde_json::from_value(Value::Object(fields))
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    Ok((body, image))
}

pub async fn create_service(
    Extension(app_state): Extension<Arc<AppState>>,
    request: Request,
) -> Result<impl IntoResponse, HttpError> {
    let (body, image) = service_form::<CreateServiceDto>(request).await?;
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let service = app_state.catalog_service.create(body.into(), image).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Service created", service)),
    ))
}

pub async fn get_service(
    Path(service_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let service = app_state.catalog_service.get(service_id).await?;
    Ok(Json(ApiResponse::success("Service", service)))
}

pub async fn update_service(
    Path(service_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    request: Request,
) -> Result<impl IntoResponse, HttpError> {
    let (body, image) = service_form::<UpdateServiceDto>(request).await?;
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let service = app_state
        .catalog_service
        .update(service_id, body.into(), image)
        .await?;
    Ok(Json(ApiResponse::success("Service updated", service)))
}

pub async fn get_service_stats(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state.report_service.catalog_stats(Utc::now()).await?;
    Ok(Json(ApiResponse::success("Service statistics", stats)))
}

pub async fn get_user_stats(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state.report_service.user_stats(Utc::now()).await?;
    Ok(Json(ApiResponse::success("User statistics", stats)))
}

pub async fn delete_service(
    Path(service_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.catalog_service.delete(service_id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Service deleted"
    })))
}

pub async fn get_revenue(
    Query(query): Query<RevenueQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let revenue = app_state.report_service.revenue(query.days).await?;
    Ok(Json(ApiResponse::success("Revenue by service", revenue)))
}

pub async fn get_revenue_for_timeframe(
    Path(timeframe): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let timeframe = timeframe
        .parse::<Timeframe>()
        .map_err(HttpError::bad_request)?;

    let revenue = app_state
        .report_service
        .revenue_for(timeframe, Utc::now())
        .await?;
    Ok(Json(ApiResponse::success("Revenue", revenue)))
}

pub async fn get_user_growth(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let growth = app_state.report_service.user_growth(Utc::now()).await?;
    Ok(Json(ApiResponse::success("User growth", growth)))
}

pub async fn get_services_usage(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let usage = app_state.report_service.services_usage().await?;
    Ok(Json(ApiResponse::success("Services usage", usage)))
}

/// Queues the CSV export; the admin is emailed a download link when it is written.
pub async fn export_service_requests(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    if !app_state.job_queue.enqueue(Job::ExportServiceRequests) {
        return Err(HttpError::server_error("Background worker is unavailable"));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "success",
            "message": "Export started. You will receive an email when it is ready"
        })),
    ))
}

pub async fn download_export(
    Path(filename): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let bytes = app_state.report_service.open_export(&filename).await?;
    let disposition = format!("attachment; filename=\"{}\"", filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
