use std::sync::Arc;

use axum::{
    extract::{Multipart, Path},
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::{
    dtos::ApiResponse,
    error::HttpError,
    middleware::{role_check, JWTAuthMiddleware, RoutePolicy},
    models::{documentmodel::DocumentType, usermodel::UserRole},
    AppState,
};

/// Raw document download for admins and the owning professional.
pub fn documents_handler() -> Router {
    Router::new().route(
        "/:id",
        get(download_document).layer(middleware::from_fn(|state, req, next| {
            role_check(
                state,
                req,
                next,
                RoutePolicy::only(&[UserRole::Admin, UserRole::Professional]).allowing_pending(),
            )
        })),
    )
}

pub async fn download_document(
    Path(document_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let document = app_state
        .document_service
        .open(document_id, user.claims.sub, user.claims.role)
        .await?;

    let disposition = format!("inline; filename=\"{}\"", document.filename);
    Ok((
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    ))
}

/// Multipart form with a `document_type` text field and a `file` part.
pub async fn upload_document(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let mut document_type: Option<DocumentType> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("document_type") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| HttpError::bad_request(e.to_string()))?;
                document_type = Some(
                    text.trim()
                        .parse::<DocumentType>()
                        .map_err(HttpError::bad_request)?,
                );
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("document").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| HttpError::bad_request(e.to_string()))?;
                file = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let document_type =
        document_type.ok_or_else(|| HttpError::bad_request("document_type is required"))?;
    let (filename, bytes) = file.ok_or_else(|| HttpError::bad_request("No file uploaded"))?;

    let document = app_state
        .document_service
        .upload(user.claims.sub, document_type, &filename, &bytes)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Document uploaded", document)),
    ))
}

pub async fn get_my_documents(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let documents = app_state.document_service.list(user.claims.sub).await?;
    Ok(Json(ApiResponse::success("Documents", documents)))
}
