use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::db::{is_unique_violation, DBClient};
use crate::models::{
    requestmodel::{RequestStatus, ServiceRequest},
    reviewmodel::*,
    usermodel::ProfessionalProfile,
};

#[async_trait]
pub trait ReviewExt {
    /// Inserts the review and folds it into the professional's running average atomically.
    async fn create_review(
        &self,
        request_id: Uuid,
        rating: i32,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<ReviewInsert, sqlx::Error>;

    async fn get_review_for_request(&self, request_id: Uuid) -> Result<Option<Review>, sqlx::Error>;

    async fn get_professional_reviews(
        &self,
        pro_id: Uuid,
        page: u32,
        per_page: usize,
    ) -> Result<Option<ReviewPage>, sqlx::Error>;

    async fn get_popular_reviews(
        &self,
        min_rating: i32,
        limit: i64,
    ) -> Result<Vec<PublicReview>, sqlx::Error>;
}

#[async_trait]
impl ReviewExt for DBClient {
    async fn create_review(
        &self,
        request_id: Uuid,
        rating: i32,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<ReviewInsert, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // FOR SHARE keeps the customer from reverting the completion underneath us.
        let request = sqlx::query_as::<_, ServiceRequest>(
            r#"SELECT * FROM service_requests WHERE id = $1 FOR SHARE"#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(request) = request else {
            return Ok(ReviewInsert::RequestMissing);
        };
        if request.status != RequestStatus::Completed {
            return Ok(ReviewInsert::NotCompleted(request.status));
        }
        let Some(pro_id) = request.pro_id else {
            return Ok(ReviewInsert::NoProfessional);
        };

        let profile = sqlx::query_as::<_, ProfessionalProfile>(
            r#"SELECT * FROM professional_profiles WHERE user_id = $1 FOR UPDATE"#,
        )
        .bind(pro_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(profile) = profile else {
            return Ok(ReviewInsert::NoProfessional);
        };

        let inserted = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, request_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request_id)
        .bind(rating)
        .bind(comment)
        .bind(at)
        .fetch_one(&mut *tx)
        .await;

        let review = match inserted {
            Ok(review) => review,
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                return Ok(ReviewInsert::AlreadyReviewed);
            }
            Err(e) => return Err(e),
        };

        let new_average = incremental_average(profile.average_rating, profile.total_reviews, rating);

        let profile = sqlx::query_as::<_, ProfessionalProfile>(
            r#"
            UPDATE professional_profiles
            SET average_rating = $2, total_reviews = total_reviews + 1
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(pro_id)
        .bind(new_average)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ReviewInsert::Created(review, profile))
    }

    async fn get_review_for_request(&self, request_id: Uuid) -> Result<Option<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(r#"SELECT * FROM reviews WHERE request_id = $1"#)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_professional_reviews(
        &self,
        pro_id: Uuid,
        page: u32,
        per_page: usize,
    ) -> Result<Option<ReviewPage>, sqlx::Error> {
        let profile = sqlx::query_as::<_, ProfessionalProfile>(
            r#"SELECT * FROM professional_profiles WHERE user_id = $1"#,
        )
        .bind(pro_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(profile) = profile else {
            return Ok(None);
        };

        let offset = (page.max(1) - 1) as i64 * per_page as i64;

        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT r.* FROM reviews r
            JOIN service_requests sr ON sr.id = r.request_id
            WHERE sr.pro_id = $1
            ORDER BY r.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(pro_id)
        .bind(per_page as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM reviews r
            JOIN service_requests sr ON sr.id = r.request_id
            WHERE sr.pro_id = $1
            "#,
        )
        .bind(pro_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(ReviewPage {
            average_rating: profile.average_rating,
            total_reviews: profile.total_reviews,
            reviews,
            total,
        }))
    }

    async fn get_popular_reviews(
        &self,
        min_rating: i32,
        limit: i64,
    ) -> Result<Vec<PublicReview>, sqlx::Error> {
        sqlx::query_as::<_, PublicReview>(
            r#"
            SELECT r.id, r.rating, r.comment, r.created_at,
                   c.full_name AS customer_name,
                   p.full_name AS professional_name,
                   s.name AS service_name
            FROM reviews r
            JOIN service_requests sr ON sr.id = r.request_id
            JOIN users c ON c.id = sr.customer_id
            LEFT JOIN users p ON p.id = sr.pro_id
            LEFT JOIN services s ON s.id = sr.service_id
            WHERE r.rating >= $1
            ORDER BY r.rating DESC, r.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(min_rating)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
