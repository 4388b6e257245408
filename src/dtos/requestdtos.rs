use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    requestmodel::{RequestAction, RequestEdit, RequestStatus},
    reviewmodel::Review,
};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceRequestDto {
    pub service_id: Uuid,
    pub professional_id: Option<Uuid>,
    #[validate(length(max = 1000, message = "Notes must be under 1000 characters"))]
    pub notes: Option<String>,
    pub completion_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CustomerActionDto {
    Cancel,
    Complete,
    Revert,
    Edit,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct UpdateServiceRequestDto {
    pub action: CustomerActionDto,
    pub service_id: Option<Uuid>,
    #[validate(length(max = 1000, message = "Notes must be under 1000 characters"))]
    pub notes: Option<String>,
    pub completion_date: Option<DateTime<Utc>>,
}

impl UpdateServiceRequestDto {
    /// Maps to a status transition, or `None` for a field edit.
    pub fn transition(&self) -> Option<RequestAction> {
        match self.action {
            CustomerActionDto::Cancel => Some(RequestAction::Cancel),
            CustomerActionDto::Complete => Some(RequestAction::MarkCompleted),
            CustomerActionDto::Revert => Some(RequestAction::RevertToAssigned),
            CustomerActionDto::Edit => None,
        }
    }

    pub fn edit(&self) -> RequestEdit {
        RequestEdit {
            service_id: self.service_id,
            notes: self.notes.clone(),
            completion_date: self.completion_date,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ProfessionalActionDto {
    Accept,
    Reject,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalRequestActionDto {
    pub action: ProfessionalActionDto,
}

impl ProfessionalRequestActionDto {
    pub fn transition(&self) -> RequestAction {
        match self.action {
            ProfessionalActionDto::Accept => RequestAction::Accept,
            ProfessionalActionDto::Reject => RequestAction::Reject,
            ProfessionalActionDto::Complete => RequestAction::Complete,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RequestListQueryDto {
    pub status: Option<RequestStatus>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 2000, message = "Comment must be under 2000 characters"))]
    pub comment: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct ReviewPageQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 50))]
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ReviewPageDto {
    pub average_rating: f64,
    pub total_reviews: i32,
    pub reviews: Vec<Review>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RevenueQueryDto {
    #[validate(range(min = 1, max = 3650))]
    pub days: Option<i64>,
}
