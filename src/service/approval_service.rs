use std::sync::Arc;

use uuid::Uuid;

use super::error::ServiceError;
use crate::{
    db::Store,
    dtos::userdtos::ProfessionalStatusDto,
    models::{documentmodel::*, usermodel::*},
};

#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct ApprovalService {
    store: Arc<dyn Store>,
}

impl ApprovalService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Professionals must clear the document gate; the check and the flag write share one transaction.
    pub async fn approve(&self, user_id: Uuid) -> Result<User, ServiceError> {
        match self.store.approve_user(user_id).await? {
            ApprovalOutcome::Approved(user) => {
                tracing::info!("✅ Approved {} account {}", user.role.to_str(), user.username);
                Ok(user)
            }
            ApprovalOutcome::Incomplete(report) => {
                tracing::warn!(
                    "Approval of {} refused: missing {:?}, unverified {:?}",
                    user_id,
                    report.missing,
                    report.unverified
                );
                Err(ServiceError::IncompleteVerification {
                    missing: report.missing,
                    unverified: report.unverified,
                })
            }
            ApprovalOutcome::Missing => Err(ServiceError::not_found("User")),
        }
    }

    pub async fn reject(&self, user_id: Uuid, reason: Option<String>) -> Result<User, ServiceError> {
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let user = self
            .store
            .reject_user(user_id, reason)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        tracing::info!("Rejected account {}", user.username);
        Ok(user)
    }

    pub async fn block(&self, user_id: Uuid) -> Result<User, ServiceError> {
        self.set_active(user_id, false).await
    }

    pub async fn unblock(&self, user_id: Uuid) -> Result<User, ServiceError> {
        self.set_active(user_id, true).await
    }

    async fn set_active(&self, user_id: Uuid, active: bool) -> Result<User, ServiceError> {
        if let Some(user) = self.store.get_user(Some(user_id), None, None).await? {
            if user.role == UserRole::Admin && !active {
                return Err(ServiceError::Validation(
                    "Admin accounts cannot be blocked".to_string(),
                ));
            }
        }
        let user = self
            .store
            .set_user_active(user_id, active)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        tracing::info!(
            "{} account {}",
            if active { "Unblocked" } else { "Blocked" },
            user.username
        );
        Ok(user)
    }

    pub async fn list_users(
        &self,
        role: Option<UserRole>,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<UserPage, ServiceError> {
        let users = self
            .store
            .get_users(role, search, page, limit as usize)
            .await?;
        let total = self.store.get_user_count(role, search).await?;
        Ok(UserPage { users, total })
    }

    /// Professionals with their profiles, for the admin review queue.
    pub async fn professionals(
        &self,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Professional>, i64), ServiceError> {
        Ok(self
            .store
            .get_professional_page(search, page, limit as usize)
            .await?)
    }

    pub async fn professional_status(&self, user_id: Uuid) -> Result<ProfessionalStatusDto, ServiceError> {
        let pro = self
            .store
            .get_professional(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Professional"))?;
        let documents = self.store.get_professional_documents(user_id).await?;
        let report = VerificationReport::of(&documents);

        Ok(ProfessionalStatusDto {
            approved: pro.user.approved,
            active: pro.user.active,
            documents_verified: pro.profile.documents_verified,
            rejection_reason: pro.profile.rejection_reason,
            missing_documents: report.missing,
            unverified_documents: report.unverified,
        })
    }
}
