//! In-process store used by unit tests. One mutex guards all tables, so every
//! trait call is atomic in the same way a single statement or transaction is.
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    catalogdb::CatalogExt, documentdb::DocumentExt, reportdb::ReportExt, requestdb::RequestExt,
    reviewdb::ReviewExt, userdb::UserExt,
};
use crate::models::{
    documentmodel::*, reportmodel::*, requestmodel::*, reviewmodel::*, servicemodel::*,
    usermodel::*,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    professionals: HashMap<Uuid, ProfessionalProfile>,
    customers: HashMap<Uuid, CustomerProfile>,
    documents: Vec<Document>,
    services: Vec<Service>,
    requests: Vec<ServiceRequest>,
    reviews: Vec<Review>,
}

impl Tables {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    fn identity(&self, id: Uuid) -> Option<Identity> {
        let user = self.user(id)?.clone();
        let profile = match user.role {
            UserRole::Admin => RoleProfile::Admin,
            UserRole::Professional => RoleProfile::Professional(self.professionals.get(&id)?.clone()),
            UserRole::Customer => RoleProfile::Customer(self.customers.get(&id)?.clone()),
        };
        Some(Identity { user, profile })
    }

    fn service_name(&self, id: Option<Uuid>) -> Option<String> {
        id.and_then(|id| self.services.iter().find(|s| s.id == id))
            .map(|s| s.name.clone())
    }

    fn full_name(&self, id: Option<Uuid>) -> Option<String> {
        id.and_then(|id| self.user(id)).map(|u| u.full_name.clone())
    }

    fn service_price(&self, id: Option<Uuid>) -> f64 {
        id.and_then(|id| self.services.iter().find(|s| s.id == id))
            .map(|s| s.base_price)
            .unwrap_or(0.0)
    }

    fn request_mut(&mut self, id: Uuid) -> Option<&mut ServiceRequest> {
        self.requests.iter_mut().find(|r| r.id == id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a professional profile, for assertions.
    pub async fn professional_profile(&self, user_id: Uuid) -> Option<ProfessionalProfile> {
        self.tables.lock().await.professionals.get(&user_id).cloned()
    }

    pub async fn review_count(&self) -> usize {
        self.tables.lock().await.reviews.len()
    }

    pub async fn backdate_user(&self, user_id: Uuid, created_at: DateTime<Utc>) {
        if let Some(user) = self.tables.lock().await.user_mut(user_id) {
            user.created_at = created_at;
        }
    }

    pub async fn backdate_service(&self, service_id: Uuid, created_at: DateTime<Utc>) {
        let mut tables = self.tables.lock().await;
        if let Some(service) = tables.services.iter_mut().find(|s| s.id == service_id) {
            service.created_at = created_at;
        }
    }
}

fn matches_search(user: &User, pattern: Option<&str>) -> bool {
    let Some(pattern) = pattern.map(str::trim).filter(|s| !s.is_empty()) else {
        return true;
    };
    let pattern = pattern.to_lowercase();
    user.username.to_lowercase().contains(&pattern)
        || user.full_name.to_lowercase().contains(&pattern)
        || user
            .email
            .as_deref()
            .map_or(false, |e| e.to_lowercase().contains(&pattern))
}

fn page_of<T: Clone>(items: &[T], page: u32, limit: usize) -> Vec<T> {
    let offset = (page.max(1) as usize - 1) * limit;
    items.iter().skip(offset).take(limit).cloned().collect()
}

#[async_trait]
impl UserExt for MemoryStore {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let tables = self.tables.lock().await;
        let found = if let Some(id) = user_id {
            tables.user(id)
        } else if let Some(username) = username {
            tables.users.iter().find(|u| u.username == username)
        } else if let Some(email) = email {
            tables.users.iter().find(|u| u.email.as_deref() == Some(email))
        } else {
            None
        };
        Ok(found.cloned())
    }

    async fn get_identity(&self, user_id: Uuid) -> Result<Option<Identity>, sqlx::Error> {
        Ok(self.tables.lock().await.identity(user_id))
    }

    async fn save_user(&self, new_user: NewUser) -> Result<Identity, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        let role = new_user.profile.role();
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            full_name: new_user.full_name,
            password: new_user.password_hash,
            role,
            approved: role.approved_on_signup(),
            active: true,
            created_at: now,
            updated_at: now,
        };

        match new_user.profile {
            NewProfile::Admin => {}
            NewProfile::Professional {
                service_type_id,
                description,
                phone_number,
                pin_code,
                experience_years,
            } => {
                tables.professionals.insert(
                    user.id,
                    ProfessionalProfile {
                        user_id: user.id,
                        service_type_id: Some(service_type_id),
                        description,
                        phone_number,
                        pin_code,
                        experience_years,
                        average_rating: 0.0,
                        total_reviews: 0,
                        documents_verified: false,
                        rejection_reason: None,
                    },
                );
            }
            NewProfile::Customer {
                address,
                phone_number,
                pin_code,
            } => {
                tables.customers.insert(
                    user.id,
                    CustomerProfile {
                        user_id: user.id,
                        address,
                        phone_number,
                        pin_code,
                    },
                );
            }
        }

        let id = user.id;
        tables.users.push(user);
        tables.identity(id).ok_or(sqlx::Error::RowNotFound)
    }

    async fn get_users(
        &self,
        role: Option<UserRole>,
        search: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<Vec<User>, sqlx::Error> {
        let tables = self.tables.lock().await;
        let matching: Vec<User> = tables
            .users
            .iter()
            .filter(|u| role.map_or(true, |r| u.role == r) && matches_search(u, search))
            .cloned()
            .collect();
        Ok(page_of(&matching, page, limit))
    }

    async fn get_user_count(
        &self,
        role: Option<UserRole>,
        search: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| role.map_or(true, |r| u.role == r) && matches_search(u, search))
            .count() as i64)
    }

    async fn get_professionals(
        &self,
        service_type_id: Option<Uuid>,
        only_available: bool,
    ) -> Result<Vec<Professional>, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| !only_available || (u.approved && u.active))
            .filter_map(|u| {
                let profile = tables.professionals.get(&u.id)?;
                if service_type_id.is_some() && profile.service_type_id != service_type_id {
                    return None;
                }
                Some(Professional {
                    user: u.clone(),
                    profile: profile.clone(),
                })
            })
            .collect())
    }

    async fn get_professional_page(
        &self,
        search: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<Professional>, i64), sqlx::Error> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<Professional> = tables
            .users
            .iter()
            .filter(|u| matches_search(u, search))
            .filter_map(|u| {
                tables.professionals.get(&u.id).map(|p| Professional {
                    user: u.clone(),
                    profile: p.clone(),
                })
            })
            .collect();
        matching.sort_by(|a, b| b.user.created_at.cmp(&a.user.created_at));
        Ok((page_of(&matching, page, limit), matching.len() as i64))
    }

    async fn get_professional(&self, user_id: Uuid) -> Result<Option<Professional>, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables.user(user_id).and_then(|u| {
            tables.professionals.get(&user_id).map(|p| Professional {
                user: u.clone(),
                profile: p.clone(),
            })
        }))
    }

    async fn set_user_active(&self, user_id: Uuid, active: bool) -> Result<Option<User>, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        Ok(tables.user_mut(user_id).map(|u| {
            u.active = active;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn reject_user(
        &self,
        user_id: Uuid,
        reason: Option<String>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        let Some(user) = tables.user_mut(user_id).map(|u| {
            u.approved = false;
            u.updated_at = Utc::now();
            u.clone()
        }) else {
            return Ok(None);
        };
        if let (Some(reason), Some(profile)) = (reason, tables.professionals.get_mut(&user_id)) {
            profile.rejection_reason = Some(reason);
        }
        Ok(Some(user))
    }

    async fn approve_user(&self, user_id: Uuid) -> Result<ApprovalOutcome, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        let Some(role) = tables.user(user_id).map(|u| u.role) else {
            return Ok(ApprovalOutcome::Missing);
        };

        if role == UserRole::Professional {
            let documents: Vec<Document> = tables
                .documents
                .iter()
                .filter(|d| d.professional_id == user_id)
                .cloned()
                .collect();
            let report = VerificationReport::of(&documents);
            if !report.is_complete() {
                return Ok(ApprovalOutcome::Incomplete(report));
            }
            if let Some(profile) = tables.professionals.get_mut(&user_id) {
                profile.rejection_reason = None;
                profile.documents_verified = true;
            }
        }

        let user = tables.user_mut(user_id).map(|u| {
            u.approved = true;
            u.updated_at = Utc::now();
            u.clone()
        });
        Ok(user.map_or(ApprovalOutcome::Missing, ApprovalOutcome::Approved))
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<Identity>, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        let Some(user) = tables.user_mut(user_id) else {
            return Ok(None);
        };
        if let Some(full_name) = update.full_name {
            user.full_name = full_name;
        }
        if update.email.is_some() {
            user.email = update.email;
        }
        user.updated_at = Utc::now();

        if let Some(profile) = tables.professionals.get_mut(&user_id) {
            if let Some(phone) = update.phone_number.clone() {
                profile.phone_number = phone;
            }
            if let Some(pin) = update.pin_code.clone() {
                profile.pin_code = pin;
            }
            if let Some(description) = update.description {
                profile.description = description;
            }
            if let Some(years) = update.experience_years {
                profile.experience_years = years;
            }
        }
        if let Some(profile) = tables.customers.get_mut(&user_id) {
            if let Some(phone) = update.phone_number {
                profile.phone_number = phone;
            }
            if let Some(pin) = update.pin_code {
                profile.pin_code = pin;
            }
            if let Some(address) = update.address {
                profile.address = address;
            }
        }
        Ok(tables.identity(user_id))
    }

    async fn admin_exists(&self) -> Result<bool, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().any(|u| u.role == UserRole::Admin))
    }
}

#[async_trait]
impl DocumentExt for MemoryStore {
    async fn save_document(
        &self,
        professional_id: Uuid,
        document_type: DocumentType,
        filename: String,
        storage_path: String,
    ) -> Result<Document, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        let Some(profile) = tables.professionals.get_mut(&professional_id) else {
            return Err(sqlx::Error::RowNotFound);
        };
        profile.documents_verified = false;
        let document = Document {
            id: Uuid::new_v4(),
            professional_id,
            document_type,
            filename,
            storage_path,
            verified: false,
            uploaded_at: Utc::now(),
        };
        tables.documents.push(document.clone());
        Ok(document)
    }

    async fn get_document(&self, document_id: Uuid) -> Result<Option<Document>, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables.documents.iter().find(|d| d.id == document_id).cloned())
    }

    async fn get_professional_documents(
        &self,
        professional_id: Uuid,
    ) -> Result<Vec<Document>, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .documents
            .iter()
            .filter(|d| d.professional_id == professional_id)
            .cloned()
            .collect())
    }

    async fn set_document_verified(
        &self,
        document_id: Uuid,
        verified: bool,
    ) -> Result<Option<(Document, bool)>, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        let Some(document) = tables.documents.iter_mut().find(|d| d.id == document_id) else {
            return Ok(None);
        };
        document.verified = verified;
        let document = document.clone();

        let all_verified = verified && {
            let owned: Vec<Document> = tables
                .documents
                .iter()
                .filter(|d| d.professional_id == document.professional_id)
                .cloned()
                .collect();
            fully_verified(&owned)
        };
        if let Some(profile) = tables.professionals.get_mut(&document.professional_id) {
            profile.documents_verified = all_verified;
        }
        Ok(Some((document, all_verified)))
    }
}

#[async_trait]
impl CatalogExt for MemoryStore {
    async fn create_service(&self, service: NewService) -> Result<Service, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let service = Service {
            id: Uuid::new_v4(),
            name: service.name,
            description: service.description,
            base_price: service.base_price,
            avg_duration: service.avg_duration,
            status: service.status,
            image_path: service.image_path,
            created_at: now,
            updated_at: now,
        };
        tables.services.push(service.clone());
        Ok(service)
    }

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables.services.iter().find(|s| s.id == service_id).cloned())
    }

    async fn get_service_by_name(&self, name: &str) -> Result<Option<Service>, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .services
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn list_services(&self, filter: ServiceFilter) -> Result<Vec<Service>, sqlx::Error> {
        let tables = self.tables.lock().await;
        let mut services: Vec<Service> = tables
            .services
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn update_service(
        &self,
        service_id: Uuid,
        update: ServiceUpdate,
    ) -> Result<Option<Service>, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        let Some(service) = tables.services.iter_mut().find(|s| s.id == service_id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            service.name = name;
        }
        if let Some(description) = update.description {
            service.description = description;
        }
        if let Some(price) = update.base_price {
            service.base_price = price;
        }
        if let Some(duration) = update.avg_duration {
            service.avg_duration = duration;
        }
        if let Some(status) = update.status {
            service.status = status;
        }
        if update.image_path.is_some() {
            service.image_path = update.image_path;
        }
        service.updated_at = Utc::now();
        Ok(Some(service.clone()))
    }

    async fn delete_service_if_unused(&self, service_id: Uuid) -> Result<ServiceDeletion, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        if !tables.services.iter().any(|s| s.id == service_id) {
            return Ok(ServiceDeletion::Missing);
        }
        let in_use = tables
            .requests
            .iter()
            .filter(|r| r.service_id == Some(service_id) && !r.status.is_terminal())
            .count() as i64;
        if in_use > 0 {
            return Ok(ServiceDeletion::InUse(in_use));
        }
        tables.services.retain(|s| s.id != service_id);
        for request in tables.requests.iter_mut().filter(|r| r.service_id == Some(service_id)) {
            request.service_id = None;
        }
        for profile in tables.professionals.values_mut() {
            if profile.service_type_id == Some(service_id) {
                profile.service_type_id = None;
            }
        }
        Ok(ServiceDeletion::Deleted)
    }
}

#[async_trait]
impl RequestExt for MemoryStore {
    async fn create_request(&self, request: NewServiceRequest) -> Result<ServiceRequest, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        let request = ServiceRequest {
            id: Uuid::new_v4(),
            service_id: Some(request.service_id),
            customer_id: request.customer_id,
            pro_id: request.pro_id,
            status: RequestStatus::Requested,
            notes: request.notes,
            request_date: request.request_date,
            completion_date: request.completion_date,
            assigned_date: None,
            completed_on: None,
            cancelled_on: None,
            cancelled_by: None,
        };
        tables.requests.push(request.clone());
        Ok(request)
    }

    async fn get_request(&self, request_id: Uuid) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables.requests.iter().find(|r| r.id == request_id).cloned())
    }

    async fn get_customer_requests(
        &self,
        customer_id: Uuid,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .requests
            .iter()
            .filter(|r| r.customer_id == customer_id && status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }

    async fn get_professional_requests(
        &self,
        pro_id: Uuid,
        service_type_id: Option<Uuid>,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .requests
            .iter()
            .filter(|r| {
                let visible = r.pro_id == Some(pro_id)
                    || (r.pro_id.is_none()
                        && r.status == RequestStatus::Requested
                        && service_type_id.is_some()
                        && r.service_id == service_type_id);
                visible && status.map_or(true, |s| r.status == s)
            })
            .cloned()
            .collect())
    }

    async fn apply_transition(
        &self,
        request_id: Uuid,
        transition: &Transition,
    ) -> Result<TransitionOutcome, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        let Some(request) = tables.request_mut(request_id) else {
            return Ok(TransitionOutcome::Missing);
        };
        if !transition.admits(request) {
            return Ok(TransitionOutcome::Rejected(request.clone()));
        }
        transition.apply_to(request);
        Ok(TransitionOutcome::Applied(request.clone()))
    }

    async fn edit_request(
        &self,
        request_id: Uuid,
        customer_id: Uuid,
        edit: &RequestEdit,
    ) -> Result<TransitionOutcome, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        let Some(request) = tables.request_mut(request_id) else {
            return Ok(TransitionOutcome::Missing);
        };
        if request.customer_id != customer_id || !edit.allowed_from().contains(&request.status) {
            return Ok(TransitionOutcome::Rejected(request.clone()));
        }
        edit.apply_to(request);
        Ok(TransitionOutcome::Applied(request.clone()))
    }
}

#[async_trait]
impl ReviewExt for MemoryStore {
    async fn create_review(
        &self,
        request_id: Uuid,
        rating: i32,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<ReviewInsert, sqlx::Error> {
        let mut tables = self.tables.lock().await;
        let Some(request) = tables.requests.iter().find(|r| r.id == request_id).cloned() else {
            return Ok(ReviewInsert::RequestMissing);
        };
        if request.status != RequestStatus::Completed {
            return Ok(ReviewInsert::NotCompleted(request.status));
        }
        let Some(pro_id) = request.pro_id else {
            return Ok(ReviewInsert::NoProfessional);
        };
        if !tables.professionals.contains_key(&pro_id) {
            return Ok(ReviewInsert::NoProfessional);
        }
        if tables.reviews.iter().any(|r| r.request_id == request_id) {
            return Ok(ReviewInsert::AlreadyReviewed);
        }

        let review = Review {
            id: Uuid::new_v4(),
            request_id,
            rating,
            comment,
            created_at: at,
        };
        tables.reviews.push(review.clone());

        let Some(profile) = tables.professionals.get_mut(&pro_id) else {
            return Ok(ReviewInsert::NoProfessional);
        };
        profile.average_rating = incremental_average(profile.average_rating, profile.total_reviews, rating);
        profile.total_reviews += 1;
        Ok(ReviewInsert::Created(review, profile.clone()))
    }

    async fn get_review_for_request(&self, request_id: Uuid) -> Result<Option<Review>, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables.reviews.iter().find(|r| r.request_id == request_id).cloned())
    }

    async fn get_professional_reviews(
        &self,
        pro_id: Uuid,
        page: u32,
        per_page: usize,
    ) -> Result<Option<ReviewPage>, sqlx::Error> {
        let tables = self.tables.lock().await;
        let Some(profile) = tables.professionals.get(&pro_id) else {
            return Ok(None);
        };
        let mut reviews: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|review| {
                tables
                    .requests
                    .iter()
                    .any(|r| r.id == review.request_id && r.pro_id == Some(pro_id))
            })
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Some(ReviewPage {
            average_rating: profile.average_rating,
            total_reviews: profile.total_reviews,
            total: reviews.len() as i64,
            reviews: page_of(&reviews, page, per_page),
        }))
    }

    async fn get_popular_reviews(
        &self,
        min_rating: i32,
        limit: i64,
    ) -> Result<Vec<PublicReview>, sqlx::Error> {
        let tables = self.tables.lock().await;
        let mut popular: Vec<PublicReview> = tables
            .reviews
            .iter()
            .filter(|r| r.rating >= min_rating)
            .filter_map(|review| {
                let request = tables.requests.iter().find(|r| r.id == review.request_id)?;
                Some(PublicReview {
                    id: review.id,
                    rating: review.rating,
                    comment: review.comment.clone(),
                    created_at: review.created_at,
                    customer_name: tables.full_name(Some(request.customer_id))?,
                    professional_name: tables.full_name(request.pro_id),
                    service_name: tables.service_name(request.service_id),
                })
            })
            .collect();
        popular.sort_by(|a, b| b.rating.cmp(&a.rating).then(b.created_at.cmp(&a.created_at)));
        popular.truncate(limit.max(0) as usize);
        Ok(popular)
    }
}

#[async_trait]
impl ReportExt for MemoryStore {
    async fn get_pending_reminders(&self) -> Result<Vec<ReminderLine>, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .requests
            .iter()
            .filter(|r| r.status == RequestStatus::Requested)
            .filter_map(|r| {
                let pro = tables.user(r.pro_id?)?;
                if !pro.active {
                    return None;
                }
                Some(ReminderLine {
                    pro_id: pro.id,
                    pro_username: pro.username.clone(),
                    pro_email: pro.email.clone(),
                    request_id: r.id,
                    service_name: tables.service_name(r.service_id),
                    customer_name: tables.full_name(Some(r.customer_id))?,
                    request_date: r.request_date,
                    notes: r.notes.clone(),
                })
            })
            .collect())
    }

    async fn get_customer_activity(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ActivityLine>, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .requests
            .iter()
            .filter(|r| r.request_date >= from && r.request_date < to)
            .filter_map(|r| {
                let customer = tables.user(r.customer_id)?;
                if !customer.active {
                    return None;
                }
                Some(ActivityLine {
                    customer_id: customer.id,
                    customer_username: customer.username.clone(),
                    customer_email: customer.email.clone(),
                    request_id: r.id,
                    service_name: tables.service_name(r.service_id),
                    professional_name: tables.full_name(r.pro_id),
                    status: r.status,
                    request_date: r.request_date,
                    completed_on: r.completed_on,
                })
            })
            .collect())
    }

    async fn get_completed_requests(&self) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .requests
            .iter()
            .filter(|r| r.status == RequestStatus::Completed)
            .cloned()
            .collect())
    }

    async fn get_customer_stats(&self, customer_id: Uuid) -> Result<CustomerStats, sqlx::Error> {
        let tables = self.tables.lock().await;
        let mut stats = CustomerStats::default();
        for r in tables.requests.iter().filter(|r| r.customer_id == customer_id) {
            stats.counts.add(r.status, 1);
            if r.status == RequestStatus::Completed {
                stats.total_spent += tables.service_price(r.service_id);
            }
        }
        Ok(stats)
    }

    async fn get_professional_stats(&self, pro_id: Uuid) -> Result<ProfessionalStats, sqlx::Error> {
        let tables = self.tables.lock().await;
        let mut stats = ProfessionalStats::default();
        for r in tables.requests.iter().filter(|r| r.pro_id == Some(pro_id)) {
            stats.counts.add(r.status, 1);
            if r.status == RequestStatus::Completed {
                stats.total_earned += tables.service_price(r.service_id);
            }
        }
        if let Some(profile) = tables.professionals.get(&pro_id) {
            stats.average_rating = profile.average_rating;
            stats.total_reviews = profile.total_reviews;
        }
        Ok(stats)
    }

    async fn get_revenue_by_service(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RevenueLine>, sqlx::Error> {
        let tables = self.tables.lock().await;
        let mut lines: Vec<RevenueLine> = Vec::new();
        for r in tables.requests.iter().filter(|r| {
            r.status == RequestStatus::Completed
                && since.map_or(true, |s| r.completed_on.map_or(false, |c| c >= s))
        }) {
            let Some(service) = r
                .service_id
                .and_then(|id| tables.services.iter().find(|s| s.id == id))
            else {
                continue;
            };
            match lines.iter_mut().find(|l| l.service_id == service.id) {
                Some(line) => {
                    line.completed_requests += 1;
                    line.revenue += service.base_price;
                }
                None => lines.push(RevenueLine {
                    service_id: service.id,
                    service_name: service.name.clone(),
                    completed_requests: 1,
                    revenue: service.base_price,
                }),
            }
        }
        lines.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
        Ok(lines)
    }

    async fn count_active_services(&self) -> Result<i64, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables.services.iter().filter(|s| s.is_active()).count() as i64)
    }

    async fn count_services_created(
        &self,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .services
            .iter()
            .filter(|s| s.created_at >= from && to.map_or(true, |to| s.created_at < to))
            .count() as i64)
    }

    async fn count_users_created(
        &self,
        role: UserRole,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| {
                u.role == role
                    && from.map_or(true, |from| u.created_at >= from)
                    && to.map_or(true, |to| u.created_at < to)
            })
            .count() as i64)
    }

    async fn get_service_usage(&self) -> Result<Vec<UsageLine>, sqlx::Error> {
        let tables = self.tables.lock().await;
        let mut lines: Vec<UsageLine> = tables
            .services
            .iter()
            .map(|s| UsageLine {
                service_id: s.id,
                service_name: s.name.clone(),
                completed_requests: tables
                    .requests
                    .iter()
                    .filter(|r| r.service_id == Some(s.id) && r.status == RequestStatus::Completed)
                    .count() as i64,
            })
            .collect();
        lines.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        Ok(lines)
    }
}

/// Seed helpers shared by service tests.
pub mod fixtures {
    use super::*;

    pub async fn service(store: &MemoryStore, name: &str, price: f64) -> Service {
        store
            .create_service(NewService {
                name: name.to_string(),
                description: format!("{} service", name),
                base_price: price,
                avg_duration: 60,
                status: ServiceStatus::Active,
                image_path: None,
            })
            .await
            .unwrap()
    }

    pub async fn customer(store: &MemoryStore, username: &str) -> Identity {
        store
            .save_user(NewUser {
                username: username.to_string(),
                email: Some(format!("{}@example.com", username)),
                full_name: format!("Customer {}", username),
                password_hash: "not-a-hash".to_string(),
                profile: NewProfile::Customer {
                    address: "1 Main Street".to_string(),
                    phone_number: "5551234567".to_string(),
                    pin_code: "560001".to_string(),
                },
            })
            .await
            .unwrap()
    }

    pub async fn admin(store: &MemoryStore, username: &str) -> Identity {
        store
            .save_user(NewUser {
                username: username.to_string(),
                email: Some(format!("{}@example.com", username)),
                full_name: "Administrator".to_string(),
                password_hash: "not-a-hash".to_string(),
                profile: NewProfile::Admin,
            })
            .await
            .unwrap()
    }

    /// Registers a professional; `approved` skips the document gate.
    pub async fn professional(
        store: &MemoryStore,
        username: &str,
        service_type_id: Uuid,
        approved: bool,
    ) -> Identity {
        let identity = store
            .save_user(NewUser {
                username: username.to_string(),
                email: Some(format!("{}@example.com", username)),
                full_name: format!("Pro {}", username),
                password_hash: "not-a-hash".to_string(),
                profile: NewProfile::Professional {
                    service_type_id,
                    description: "Ten years in the trade".to_string(),
                    phone_number: "5557654321".to_string(),
                    pin_code: "560002".to_string(),
                    experience_years: 10,
                },
            })
            .await
            .unwrap();

        if approved {
            let mut tables = store.tables.lock().await;
            if let Some(user) = tables.user_mut(identity.user.id) {
                user.approved = true;
            }
            if let Some(profile) = tables.professionals.get_mut(&identity.user.id) {
                profile.documents_verified = true;
            }
            return tables.identity(identity.user.id).unwrap();
        }
        identity
    }

    /// Uploads and verifies every required document for `pro_id`.
    pub async fn verified_documents(store: &MemoryStore, pro_id: Uuid) {
        for document_type in DocumentType::REQUIRED {
            let document = store
                .save_document(
                    pro_id,
                    document_type,
                    format!("{}.pdf", document_type),
                    format!("key_{}", document_type),
                )
                .await
                .unwrap();
            store.set_document_verified(document.id, true).await.unwrap();
        }
    }

    /// Inserts a request directly in the given state.
    pub async fn request(
        store: &MemoryStore,
        service_id: Uuid,
        customer_id: Uuid,
        pro_id: Option<Uuid>,
        status: RequestStatus,
    ) -> ServiceRequest {
        let mut request = store
            .create_request(NewServiceRequest {
                service_id,
                customer_id,
                pro_id,
                notes: Some("Leaking tap".to_string()),
                completion_date: None,
                request_date: Utc::now(),
            })
            .await
            .unwrap();
        let mut tables = store.tables.lock().await;
        if let Some(stored) = tables.request_mut(request.id) {
            stored.status = status;
            if status == RequestStatus::Completed {
                stored.completed_on = Some(Utc::now());
            }
            request = stored.clone();
        }
        request
    }
}
