use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{
    error::ServiceError,
    lifecycle::{self, Actor},
};
use crate::{
    db::Store,
    dtos::requestdtos::CreateServiceRequestDto,
    models::requestmodel::*,
};

#[derive(Debug, Clone)]
pub struct RequestService {
    store: Arc<dyn Store>,
}

impl RequestService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn active_service(&self, service_id: Uuid) -> Result<(), ServiceError> {
        match self.store.get_service(service_id).await? {
            Some(service) if service.is_active() => Ok(()),
            Some(_) => Err(ServiceError::Validation(
                "Service is not currently offered".to_string(),
            )),
            None => Err(ServiceError::not_found("Service")),
        }
    }

    /// The chosen professional is kept only when approved, active and offering the service.
    async fn eligible_professional(
        &self,
        pro_id: Option<Uuid>,
        service_id: Uuid,
    ) -> Result<Option<Uuid>, ServiceError> {
        let Some(pro_id) = pro_id else {
            return Ok(None);
        };
        match self.store.get_professional(pro_id).await? {
            Some(pro)
                if pro.user.approved
                    && pro.user.active
                    && pro.profile.service_type_id == Some(service_id) =>
            {
                Ok(Some(pro_id))
            }
            _ => {
                tracing::warn!(
                    "Professional {} cannot take service {}; request left unassigned",
                    pro_id,
                    service_id
                );
                Ok(None)
            }
        }
    }

    pub async fn create(
        &self,
        customer_id: Uuid,
        body: CreateServiceRequestDto,
    ) -> Result<ServiceRequest, ServiceError> {
        self.active_service(body.service_id).await?;
        let pro_id = self
            .eligible_professional(body.professional_id, body.service_id)
            .await?;

        let request = self
            .store
            .create_request(NewServiceRequest {
                service_id: body.service_id,
                customer_id,
                pro_id,
                notes: body.notes.filter(|n| !n.trim().is_empty()),
                completion_date: body.completion_date,
                request_date: Utc::now(),
            })
            .await?;

        tracing::info!(
            "Customer {} requested service {} (request {})",
            customer_id,
            body.service_id,
            request.id
        );
        Ok(request)
    }

    pub async fn customer_requests(
        &self,
        customer_id: Uuid,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ServiceRequest>, ServiceError> {
        Ok(self.store.get_customer_requests(customer_id, status).await?)
    }

    /// Completed and cancelled requests, most recent first.
    pub async fn history(&self, customer_id: Uuid) -> Result<Vec<ServiceRequest>, ServiceError> {
        let mut requests: Vec<ServiceRequest> = self
            .store
            .get_customer_requests(customer_id, None)
            .await?
            .into_iter()
            .filter(|r| r.status.is_terminal())
            .collect();
        requests.sort_by(|a, b| b.request_date.cmp(&a.request_date));
        Ok(requests)
    }

    /// Another customer's request reads as missing.
    pub async fn customer_request(
        &self,
        customer_id: Uuid,
        request_id: Uuid,
    ) -> Result<ServiceRequest, ServiceError> {
        match self.store.get_request(request_id).await? {
            Some(request) if request.customer_id == customer_id => Ok(request),
            _ => Err(ServiceError::not_found("Service request")),
        }
    }

    async fn service_type_of(&self, pro_id: Uuid) -> Result<Option<Uuid>, ServiceError> {
        let pro = self
            .store
            .get_professional(pro_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Professional"))?;
        Ok(pro.profile.service_type_id)
    }

    pub async fn professional_requests(
        &self,
        pro_id: Uuid,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ServiceRequest>, ServiceError> {
        let service_type = self.service_type_of(pro_id).await?;
        Ok(self
            .store
            .get_professional_requests(pro_id, service_type, status)
            .await?)
    }

    /// Visible when bound to the professional or still claimable by them.
    pub async fn professional_request(
        &self,
        pro_id: Uuid,
        request_id: Uuid,
    ) -> Result<ServiceRequest, ServiceError> {
        let service_type = self.service_type_of(pro_id).await?;
        let claimable = ProGuard::Claimable {
            pro: pro_id,
            service_type,
        };
        match self.store.get_request(request_id).await? {
            Some(request)
                if request.pro_id == Some(pro_id)
                    || (request.status == RequestStatus::Requested && claimable.admits(&request)) =>
            {
                Ok(request)
            }
            _ => Err(ServiceError::not_found("Service request")),
        }
    }

    async fn transition(
        &self,
        request_id: Uuid,
        actor: Actor,
        action: RequestAction,
    ) -> Result<ServiceRequest, ServiceError> {
        let transition = lifecycle::plan(actor, action, Utc::now())?;

        match self.store.apply_transition(request_id, &transition).await? {
            TransitionOutcome::Applied(request) => {
                tracing::info!(
                    "Request {} {} -> {} ({})",
                    request.id,
                    action,
                    request.status,
                    match actor {
                        Actor::Customer(id) => format!("customer {}", id),
                        Actor::Professional { id, .. } => format!("professional {}", id),
                    }
                );
                Ok(request)
            }
            TransitionOutcome::Rejected(current) => {
                tracing::warn!(
                    "Refused {} on request {} in status {}",
                    action,
                    request_id,
                    current.status
                );
                Err(lifecycle::rejection(&transition, &current))
            }
            TransitionOutcome::Missing => Err(ServiceError::not_found("Service request")),
        }
    }

    pub async fn customer_action(
        &self,
        customer_id: Uuid,
        request_id: Uuid,
        action: RequestAction,
    ) -> Result<ServiceRequest, ServiceError> {
        // Ownership first, so a stranger's request never leaks its status.
        self.customer_request(customer_id, request_id).await?;
        self.transition(request_id, Actor::Customer(customer_id), action)
            .await
    }

    pub async fn professional_action(
        &self,
        pro_id: Uuid,
        request_id: Uuid,
        action: RequestAction,
    ) -> Result<ServiceRequest, ServiceError> {
        let service_type = self.service_type_of(pro_id).await?;
        self.transition(
            request_id,
            Actor::Professional {
                id: pro_id,
                service_type,
            },
            action,
        )
        .await
    }

    /// Changing the service is only possible while the request is still unassigned.
    pub async fn edit(
        &self,
        customer_id: Uuid,
        request_id: Uuid,
        edit: RequestEdit,
    ) -> Result<ServiceRequest, ServiceError> {
        if edit.is_empty() {
            return Err(ServiceError::Validation("Nothing to update".to_string()));
        }
        if let Some(service_id) = edit.service_id {
            self.active_service(service_id).await?;
        }

        match self.store.edit_request(request_id, customer_id, &edit).await? {
            TransitionOutcome::Applied(request) => {
                tracing::info!("Request {} edited by customer {}", request.id, customer_id);
                Ok(request)
            }
            TransitionOutcome::Rejected(current) if current.customer_id != customer_id => {
                Err(ServiceError::not_found("Service request"))
            }
            TransitionOutcome::Rejected(current) => Err(ServiceError::InvalidTransition {
                current: current.status,
                action: RequestAction::Edit,
            }),
            TransitionOutcome::Missing => Err(ServiceError::not_found("Service request")),
        }
    }
}
