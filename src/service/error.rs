use serde_json::json;
use thiserror::Error;

use crate::{
    error::{ErrorMessage, HttpError},
    models::{
        documentmodel::DocumentType,
        requestmodel::{RequestAction, RequestStatus},
    },
    service::storage::StorageError,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("Your account is pending admin approval")]
    PendingApproval,

    #[error("Your account has been deactivated")]
    AccountInactive,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Cannot {action} a request that is {current}")]
    InvalidTransition {
        current: RequestStatus,
        action: RequestAction,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Dependency(String),

    #[error("Professional documents are incomplete or unverified")]
    IncompleteVerification {
        missing: Vec<DocumentType>,
        unverified: Vec<DocumentType>,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Other error: {0}")]
    Other(String),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let message = error.to_string();
        match error {
            ServiceError::Authentication(_) => HttpError::unauthorized(message),
            ServiceError::Authorization(_) => HttpError::forbidden(message),
            ServiceError::PendingApproval => {
                HttpError::forbidden(ErrorMessage::PendingApproval.to_string())
            }
            ServiceError::AccountInactive => {
                HttpError::forbidden(ErrorMessage::AccountInactive.to_string())
            }
            ServiceError::NotFound(_) => HttpError::not_found(message),
            ServiceError::InvalidTransition { current, action } => {
                HttpError::conflict(message).with_details(json!({
                    "current_status": current,
                    "action": action,
                }))
            }
            ServiceError::Conflict(_) => HttpError::conflict(message),
            ServiceError::Validation(_) => HttpError::bad_request(message),
            ServiceError::IncompleteVerification {
                missing,
                unverified,
            } => HttpError::bad_request(message).with_details(json!({
                "missing_documents": missing,
                "unverified_documents": unverified,
            })),
            ServiceError::Dependency(_) => HttpError::unprocessable(message),
            ServiceError::Database(e) => {
                tracing::error!("Database failure: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
            ServiceError::Storage(e) => {
                tracing::error!("Document storage failure: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
            ServiceError::Other(e) => {
                tracing::error!("Unexpected failure: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        }
    }
}

impl From<String> for ServiceError {
    fn from(err: String) -> Self {
        ServiceError::Other(err)
    }
}
