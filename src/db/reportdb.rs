use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::{
    reportmodel::*,
    requestmodel::{RequestStatus, ServiceRequest},
    usermodel::UserRole,
};

/// Read-only queries behind the scheduled jobs and dashboards.
#[async_trait]
pub trait ReportExt {
    async fn get_pending_reminders(&self) -> Result<Vec<ReminderLine>, sqlx::Error>;

    async fn get_customer_activity(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ActivityLine>, sqlx::Error>;

    async fn get_completed_requests(&self) -> Result<Vec<ServiceRequest>, sqlx::Error>;

    async fn get_customer_stats(&self, customer_id: Uuid) -> Result<CustomerStats, sqlx::Error>;

    async fn get_professional_stats(&self, pro_id: Uuid) -> Result<ProfessionalStats, sqlx::Error>;

    async fn get_revenue_by_service(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RevenueLine>, sqlx::Error>;

    async fn count_active_services(&self) -> Result<i64, sqlx::Error>;

    /// Services created in `[from, to)`; an open `to` runs to now.
    async fn count_services_created(
        &self,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error>;

    /// Accounts of `role` created in `[from, to)`; open bounds are unbounded.
    async fn count_users_created(
        &self,
        role: UserRole,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error>;

    async fn get_service_usage(&self) -> Result<Vec<UsageLine>, sqlx::Error>;
}

#[async_trait]
impl ReportExt for DBClient {
    async fn get_pending_reminders(&self) -> Result<Vec<ReminderLine>, sqlx::Error> {
        let mut tx = self.begin_read_only().await?;
        let lines = sqlx::query_as::<_, ReminderLine>(
            r#"
            SELECT p.id AS pro_id, p.username AS pro_username, p.email AS pro_email,
                   sr.id AS request_id, s.name AS service_name,
                   c.full_name AS customer_name, sr.request_date, sr.notes
            FROM service_requests sr
            JOIN users p ON p.id = sr.pro_id
            JOIN users c ON c.id = sr.customer_id
            LEFT JOIN services s ON s.id = sr.service_id
            WHERE sr.status = 'requested' AND p.active
            ORDER BY p.id, sr.request_date
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(lines)
    }

    async fn get_customer_activity(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ActivityLine>, sqlx::Error> {
        let mut tx = self.begin_read_only().await?;
        let lines = sqlx::query_as::<_, ActivityLine>(
            r#"
            SELECT c.id AS customer_id, c.username AS customer_username, c.email AS customer_email,
                   sr.id AS request_id, s.name AS service_name, p.full_name AS professional_name,
                   sr.status, sr.request_date, sr.completed_on
            FROM service_requests sr
            JOIN users c ON c.id = sr.customer_id
            LEFT JOIN users p ON p.id = sr.pro_id
            LEFT JOIN services s ON s.id = sr.service_id
            WHERE sr.request_date >= $1 AND sr.request_date < $2 AND c.active
            ORDER BY c.id, sr.request_date
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(lines)
    }

    async fn get_completed_requests(&self) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        let mut tx = self.begin_read_only().await?;
        let requests = sqlx::query_as::<_, ServiceRequest>(
            r#"
            SELECT * FROM service_requests
            WHERE status = 'completed'
            ORDER BY request_date
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(requests)
    }

    async fn get_customer_stats(&self, customer_id: Uuid) -> Result<CustomerStats, sqlx::Error> {
        let mut tx = self.begin_read_only().await?;

        let rows = sqlx::query_as::<_, (RequestStatus, i64)>(
            r#"
            SELECT status, COUNT(*) FROM service_requests
            WHERE customer_id = $1
            GROUP BY status
            "#,
        )
        .bind(customer_id)
        .fetch_all(&mut *tx)
        .await?;

        let total_spent = sqlx::query_scalar::<_, Option<f64>>(
            r#"
            SELECT SUM(s.base_price) FROM service_requests sr
            JOIN services s ON s.id = sr.service_id
            WHERE sr.customer_id = $1 AND sr.status = 'completed'
            "#,
        )
        .bind(customer_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CustomerStats {
            counts: StatusCounts::from_rows(&rows),
            total_spent: total_spent.unwrap_or(0.0),
        })
    }

    async fn get_professional_stats(&self, pro_id: Uuid) -> Result<ProfessionalStats, sqlx::Error> {
        let mut tx = self.begin_read_only().await?;

        let rows = sqlx::query_as::<_, (RequestStatus, i64)>(
            r#"
            SELECT status, COUNT(*) FROM service_requests
            WHERE pro_id = $1
            GROUP BY status
            "#,
        )
        .bind(pro_id)
        .fetch_all(&mut *tx)
        .await?;

        let total_earned = sqlx::query_scalar::<_, Option<f64>>(
            r#"
            SELECT SUM(s.base_price) FROM service_requests sr
            JOIN services s ON s.id = sr.service_id
            WHERE sr.pro_id = $1 AND sr.status = 'completed'
            "#,
        )
        .bind(pro_id)
        .fetch_one(&mut *tx)
        .await?;

        let rating = sqlx::query_as::<_, (f64, i32)>(
            r#"SELECT average_rating, total_reviews FROM professional_profiles WHERE user_id = $1"#,
        )
        .bind(pro_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        let (average_rating, total_reviews) = rating.unwrap_or((0.0, 0));
        Ok(ProfessionalStats {
            counts: StatusCounts::from_rows(&rows),
            total_earned: total_earned.unwrap_or(0.0),
            average_rating,
            total_reviews,
        })
    }

    async fn get_revenue_by_service(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RevenueLine>, sqlx::Error> {
        let mut tx = self.begin_read_only().await?;
        let lines = sqlx::query_as::<_, RevenueLine>(
            r#"
            SELECT s.id AS service_id, s.name AS service_name,
                   COUNT(sr.id) AS completed_requests,
                   COALESCE(SUM(s.base_price), 0)::float8 AS revenue
            FROM services s
            JOIN service_requests sr ON sr.service_id = s.id
            WHERE sr.status = 'completed'
              AND ($1::timestamptz IS NULL OR sr.completed_on >= $1)
            GROUP BY s.id, s.name
            ORDER BY revenue DESC
            "#,
        )
        .bind(since)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(lines)
    }

    async fn count_active_services(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM services WHERE status = 'active'"#)
            .fetch_one(&self.pool)
            .await
    }

    async fn count_services_created(
        &self,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM services
            WHERE created_at >= $1
              AND ($2::timestamptz IS NULL OR created_at < $2)
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_users_created(
        &self,
        role: UserRole,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE role = $1
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            "#,
        )
        .bind(role)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_service_usage(&self) -> Result<Vec<UsageLine>, sqlx::Error> {
        let mut tx = self.begin_read_only().await?;
        let lines = sqlx::query_as::<_, UsageLine>(
            r#"
            SELECT s.id AS service_id, s.name AS service_name,
                   COUNT(sr.id) AS completed_requests
            FROM services s
            LEFT JOIN service_requests sr
                   ON sr.service_id = s.id AND sr.status = 'completed'
            GROUP BY s.id, s.name
            ORDER BY s.name
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(lines)
    }
}
