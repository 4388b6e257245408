use std::sync::Arc;

use chrono::Utc;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use super::error::ServiceError;
use crate::{
    db::{
        cache::{CacheHelper, POPULAR_REVIEWS_KEY, POPULAR_REVIEWS_TTL},
        Store,
    },
    dtos::requestdtos::ReviewPageDto,
    models::{requestmodel::RequestAction, reviewmodel::*},
};

pub const DEFAULT_PER_PAGE: u32 = 5;
pub const POPULAR_MIN_RATING: i32 = 4;
pub const POPULAR_LIMIT: i64 = 5;

#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn Store>,
    cache: Option<Arc<ConnectionManager>>,
}

impl std::fmt::Debug for ReviewService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewService")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl ReviewService {
    pub fn new(store: Arc<dyn Store>, cache: Option<Arc<ConnectionManager>>) -> Self {
        Self { store, cache }
    }

    async fn owned_request(&self, customer_id: Uuid, request_id: Uuid) -> Result<(), ServiceError> {
        match self.store.get_request(request_id).await? {
            Some(request) if request.customer_id == customer_id => Ok(()),
            _ => Err(ServiceError::not_found("Service request")),
        }
    }

    /// One review per completed request; the professional's rating moves in the same transaction.
    pub async fn submit(
        &self,
        customer_id: Uuid,
        request_id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review, ServiceError> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(ServiceError::Validation(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        self.owned_request(customer_id, request_id).await?;

        let comment = comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());

        match self
            .store
            .create_review(request_id, rating, comment, Utc::now())
            .await?
        {
            ReviewInsert::Created(review, profile) => {
                tracing::info!(
                    "Review {} stored; professional {} now {:.2} over {} review(s)",
                    review.id,
                    profile.user_id,
                    profile.average_rating,
                    profile.total_reviews
                );
                if let Some(redis) = &self.cache {
                    if let Err(e) = CacheHelper::delete(redis, POPULAR_REVIEWS_KEY).await {
                        tracing::warn!("Failed to invalidate popular reviews cache: {}", e);
                    }
                }
                Ok(review)
            }
            ReviewInsert::AlreadyReviewed => Err(ServiceError::Conflict(
                "This service request has already been reviewed".to_string(),
            )),
            ReviewInsert::NotCompleted(current) => Err(ServiceError::InvalidTransition {
                current,
                action: RequestAction::Review,
            }),
            ReviewInsert::NoProfessional => Err(ServiceError::Validation(
                "No professional was assigned to this request".to_string(),
            )),
            ReviewInsert::RequestMissing => Err(ServiceError::not_found("Service request")),
        }
    }

    pub async fn review_for_request(
        &self,
        customer_id: Uuid,
        request_id: Uuid,
    ) -> Result<Review, ServiceError> {
        self.owned_request(customer_id, request_id).await?;
        self.store
            .get_review_for_request(request_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Review"))
    }

    pub async fn professional_reviews(
        &self,
        pro_id: Uuid,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<ReviewPageDto, ServiceError> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).max(1);

        let found = self
            .store
            .get_professional_reviews(pro_id, page, per_page as usize)
            .await?
            .ok_or_else(|| ServiceError::not_found("Professional"))?;

        Ok(ReviewPageDto {
            average_rating: found.average_rating,
            total_reviews: found.total_reviews,
            reviews: found.reviews,
            page,
            per_page,
            total: found.total,
        })
    }

    /// Top rated reviews for the landing page.
    pub async fn popular(&self) -> Result<Vec<PublicReview>, ServiceError> {
        if let Some(redis) = &self.cache {
            if let Ok(Some(reviews)) = CacheHelper::get::<Vec<PublicReview>>(redis, POPULAR_REVIEWS_KEY).await {
                return Ok(reviews);
            }
        }

        let reviews = self
            .store
            .get_popular_reviews(POPULAR_MIN_RATING, POPULAR_LIMIT)
            .await?;

        if let Some(redis) = &self.cache {
            if let Err(e) = CacheHelper::set(redis, POPULAR_REVIEWS_KEY, &reviews, POPULAR_REVIEWS_TTL).await {
                tracing::warn!("Failed to cache popular reviews: {}", e);
            }
        }
        Ok(reviews)
    }
}
