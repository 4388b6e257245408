use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{requestmodel::RequestStatus, usermodel::ProfessionalProfile};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub request_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Review joined with the names shown on the public landing page.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct PublicReview {
    pub id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub professional_name: Option<String>,
    pub service_name: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ReviewPage {
    pub average_rating: f64,
    pub total_reviews: i32,
    pub reviews: Vec<Review>,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub enum ReviewInsert {
    Created(Review, ProfessionalProfile),
    AlreadyReviewed,
    NotCompleted(RequestStatus),
    /// The request was completed without a professional ever being bound.
    NoProfessional,
    RequestMissing,
}

/// Running mean after one more rating.
pub fn incremental_average(old_avg: f64, old_count: i32, rating: i32) -> f64 {
    let count = f64::from(old_count);
    (old_avg * count + f64::from(rating)) / (count + 1.0)
}
