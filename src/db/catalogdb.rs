use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::{requestmodel::RequestStatus, servicemodel::*};

#[async_trait]
pub trait CatalogExt {
    async fn create_service(&self, service: NewService) -> Result<Service, sqlx::Error>;

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, sqlx::Error>;

    async fn get_service_by_name(&self, name: &str) -> Result<Option<Service>, sqlx::Error>;

    async fn list_services(&self, filter: ServiceFilter) -> Result<Vec<Service>, sqlx::Error>;

    async fn update_service(
        &self,
        service_id: Uuid,
        update: ServiceUpdate,
    ) -> Result<Option<Service>, sqlx::Error>;

    /// Deletes the service unless a requested or assigned request still references it.
    async fn delete_service_if_unused(&self, service_id: Uuid) -> Result<ServiceDeletion, sqlx::Error>;
}

#[async_trait]
impl CatalogExt for DBClient {
    async fn create_service(&self, service: NewService) -> Result<Service, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (id, name, description, base_price, avg_duration, status, image_path, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(service.name)
        .bind(service.description)
        .bind(service.base_price)
        .bind(service.avg_duration)
        .bind(service.status)
        .bind(service.image_path)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, sqlx::Error> {
        sqlx::query_as::<_, Service>(r#"SELECT * FROM services WHERE id = $1"#)
            .bind(service_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_service_by_name(&self, name: &str) -> Result<Option<Service>, sqlx::Error> {
        sqlx::query_as::<_, Service>(r#"SELECT * FROM services WHERE LOWER(name) = LOWER($1)"#)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_services(&self, filter: ServiceFilter) -> Result<Vec<Service>, sqlx::Error> {
        let name = filter
            .name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        sqlx::query_as::<_, Service>(
            r#"
            SELECT * FROM services
            WHERE ($1 OR status = 'active')
              AND ($2::text IS NULL OR name ILIKE $2)
              AND ($3::float8 IS NULL OR base_price >= $3)
              AND ($4::float8 IS NULL OR base_price <= $4)
            ORDER BY name
            "#,
        )
        .bind(filter.include_inactive)
        .bind(name)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_service(
        &self,
        service_id: Uuid,
        update: ServiceUpdate,
    ) -> Result<Option<Service>, sqlx::Error> {
        sqlx::query_as::<_, Service>(
            r#"
            UPDATE services
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                base_price = COALESCE($4, base_price),
                avg_duration = COALESCE($5, avg_duration),
                status = COALESCE($6, status),
                image_path = COALESCE($7, image_path),
                updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(service_id)
        .bind(update.name)
        .bind(update.description)
        .bind(update.base_price)
        .bind(update.avg_duration)
        .bind(update.status)
        .bind(update.image_path)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_service_if_unused(&self, service_id: Uuid) -> Result<ServiceDeletion, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>(r#"SELECT id FROM services WHERE id = $1 FOR UPDATE"#)
            .bind(service_id)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Ok(ServiceDeletion::Missing);
        }

        let in_use = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM service_requests
            WHERE service_id = $1 AND status = ANY($2)
            "#,
        )
        .bind(service_id)
        .bind(RequestStatus::open())
        .fetch_one(&mut *tx)
        .await?;

        if in_use > 0 {
            tx.rollback().await?;
            return Ok(ServiceDeletion::InUse(in_use));
        }

        sqlx::query(r#"DELETE FROM services WHERE id = $1"#)
            .bind(service_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ServiceDeletion::Deleted)
    }
}
