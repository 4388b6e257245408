use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::requestmodel::*;

#[async_trait]
pub trait RequestExt {
    async fn create_request(&self, request: NewServiceRequest) -> Result<ServiceRequest, sqlx::Error>;

    async fn get_request(&self, request_id: Uuid) -> Result<Option<ServiceRequest>, sqlx::Error>;

    async fn get_customer_requests(
        &self,
        customer_id: Uuid,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ServiceRequest>, sqlx::Error>;

    /// Requests bound to the professional plus unclaimed ones for their service type.
    async fn get_professional_requests(
        &self,
        pro_id: Uuid,
        service_type_id: Option<Uuid>,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ServiceRequest>, sqlx::Error>;

    /// Compare-and-swap on status, ownership and binding. Status and timestamps land in one statement.
    async fn apply_transition(
        &self,
        request_id: Uuid,
        transition: &Transition,
    ) -> Result<TransitionOutcome, sqlx::Error>;

    async fn edit_request(
        &self,
        request_id: Uuid,
        customer_id: Uuid,
        edit: &RequestEdit,
    ) -> Result<TransitionOutcome, sqlx::Error>;
}

fn stamp_parts(stamp: Stamp) -> (&'static str, Option<CancelledBy>) {
    match stamp {
        Stamp::Assigned => ("assigned", None),
        Stamp::Completed => ("completed", None),
        Stamp::Cancelled(by) => ("cancelled", Some(by)),
        Stamp::ClearCompleted => ("clear_completed", None),
    }
}

fn guard_parts(guard: &ProGuard) -> (&'static str, Option<Uuid>, Option<Uuid>) {
    match guard {
        ProGuard::Any => ("any", None, None),
        ProGuard::Owner(pro) => ("owner", Some(*pro), None),
        ProGuard::Bound => ("bound", None, None),
        ProGuard::Claimable { pro, service_type } => ("claimable", Some(*pro), *service_type),
    }
}

impl DBClient {
    async fn outcome_after_miss(&self, request_id: Uuid) -> Result<TransitionOutcome, sqlx::Error> {
        Ok(match self.get_request(request_id).await? {
            Some(current) => TransitionOutcome::Rejected(current),
            None => TransitionOutcome::Missing,
        })
    }
}

#[async_trait]
impl RequestExt for DBClient {
    async fn create_request(&self, request: NewServiceRequest) -> Result<ServiceRequest, sqlx::Error> {
        sqlx::query_as::<_, ServiceRequest>(
            r#"
            INSERT INTO service_requests
                (id, service_id, customer_id, pro_id, status, notes, request_date, completion_date)
            VALUES ($1, $2, $3, $4, 'requested', $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.service_id)
        .bind(request.customer_id)
        .bind(request.pro_id)
        .bind(request.notes)
        .bind(request.request_date)
        .bind(request.completion_date)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_request(&self, request_id: Uuid) -> Result<Option<ServiceRequest>, sqlx::Error> {
        sqlx::query_as::<_, ServiceRequest>(r#"SELECT * FROM service_requests WHERE id = $1"#)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_customer_requests(
        &self,
        customer_id: Uuid,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        sqlx::query_as::<_, ServiceRequest>(
            r#"
            SELECT * FROM service_requests
            WHERE customer_id = $1 AND ($2::request_status IS NULL OR status = $2)
            ORDER BY request_date DESC
            "#,
        )
        .bind(customer_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_professional_requests(
        &self,
        pro_id: Uuid,
        service_type_id: Option<Uuid>,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        sqlx::query_as::<_, ServiceRequest>(
            r#"
            SELECT * FROM service_requests
            WHERE (pro_id = $1
                   OR (pro_id IS NULL AND status = 'requested' AND $2::uuid IS NOT NULL AND service_id = $2))
              AND ($3::request_status IS NULL OR status = $3)
            ORDER BY request_date DESC
            "#,
        )
        .bind(pro_id)
        .bind(service_type_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await
    }

    async fn apply_transition(
        &self,
        request_id: Uuid,
        transition: &Transition,
    ) -> Result<TransitionOutcome, sqlx::Error> {
        let (stamp, cancelled_by) = stamp_parts(transition.stamp);
        let (guard, guard_pro, guard_service) = guard_parts(&transition.pro_guard);

        let updated = sqlx::query_as::<_, ServiceRequest>(
            r#"
            UPDATE service_requests
            SET status = $2,
                pro_id = COALESCE($3, pro_id),
                assigned_date = CASE WHEN $4 = 'assigned' THEN $5 ELSE assigned_date END,
                completed_on = CASE
                    WHEN $4 = 'completed' THEN $5
                    WHEN $4 = 'clear_completed' THEN NULL
                    ELSE completed_on END,
                cancelled_on = CASE WHEN $4 = 'cancelled' THEN $5 ELSE cancelled_on END,
                cancelled_by = CASE WHEN $4 = 'cancelled' THEN $6 ELSE cancelled_by END
            WHERE id = $1
              AND status = ANY($7)
              AND ($8::uuid IS NULL OR customer_id = $8)
              AND (
                    $9 = 'any'
                 OR ($9 = 'owner' AND pro_id = $10)
                 OR ($9 = 'bound' AND pro_id IS NOT NULL)
                 OR ($9 = 'claimable' AND (
                        pro_id = $10
                     OR (pro_id IS NULL AND $11::uuid IS NOT NULL AND service_id = $11)))
              )
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(transition.to)
        .bind(transition.bind_pro)
        .bind(stamp)
        .bind(transition.at)
        .bind(cancelled_by)
        .bind(&transition.from)
        .bind(transition.customer)
        .bind(guard)
        .bind(guard_pro)
        .bind(guard_service)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(request) => Ok(TransitionOutcome::Applied(request)),
            None => self.outcome_after_miss(request_id).await,
        }
    }

    async fn edit_request(
        &self,
        request_id: Uuid,
        customer_id: Uuid,
        edit: &RequestEdit,
    ) -> Result<TransitionOutcome, sqlx::Error> {
        let updated = sqlx::query_as::<_, ServiceRequest>(
            r#"
            UPDATE service_requests
            SET service_id = COALESCE($3, service_id),
                notes = COALESCE($4, notes),
                completion_date = COALESCE($5, completion_date)
            WHERE id = $1 AND customer_id = $2 AND status = ANY($6)
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(customer_id)
        .bind(edit.service_id)
        .bind(&edit.notes)
        .bind(edit.completion_date)
        .bind(edit.allowed_from())
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(request) => Ok(TransitionOutcome::Applied(request)),
            None => self.outcome_after_miss(request_id).await,
        }
    }
}
