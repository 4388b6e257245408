use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Professional,
    Customer,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Professional => "professional",
            UserRole::Customer => "customer",
        }
    }

    /// Customers and admins are usable straight away, professionals wait for review.
    pub fn approved_on_signup(&self) -> bool {
        !matches!(self, UserRole::Professional)
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub full_name: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub role: UserRole,
    pub approved: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct ProfessionalProfile {
    pub user_id: Uuid,
    pub service_type_id: Option<Uuid>,
    pub description: String,
    pub phone_number: String,
    pub pin_code: String,
    pub experience_years: i32,
    pub average_rating: f64,
    pub total_reviews: i32,
    pub documents_verified: bool,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct CustomerProfile {
    pub user_id: Uuid,
    pub address: String,
    pub phone_number: String,
    pub pin_code: String,
}

/// Role specific data attached to an identity.
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum RoleProfile {
    Admin,
    Professional(ProfessionalProfile),
    Customer(CustomerProfile),
}

#[derive(Debug, Serialize, Clone)]
pub struct Identity {
    pub user: User,
    pub profile: RoleProfile,
}

impl Identity {
    pub fn professional(&self) -> Option<&ProfessionalProfile> {
        match &self.profile {
            RoleProfile::Professional(p) => Some(p),
            _ => None,
        }
    }

    pub fn customer(&self) -> Option<&CustomerProfile> {
        match &self.profile {
            RoleProfile::Customer(c) => Some(c),
            _ => None,
        }
    }
}

/// A professional joined with its account row, as listed publicly and to admins.
#[derive(Debug, Serialize, Clone)]
pub struct Professional {
    pub user: User,
    pub profile: ProfessionalProfile,
}

/// Profile payload supplied when an account is created.
#[derive(Debug, Clone)]
pub enum NewProfile {
    Admin,
    Professional {
        service_type_id: Uuid,
        description: String,
        phone_number: String,
        pin_code: String,
        experience_years: i32,
    },
    Customer {
        address: String,
        phone_number: String,
        pin_code: String,
    },
}

impl NewProfile {
    pub fn role(&self) -> UserRole {
        match self {
            NewProfile::Admin => UserRole::Admin,
            NewProfile::Professional { .. } => UserRole::Professional,
            NewProfile::Customer { .. } => UserRole::Customer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub full_name: String,
    pub password_hash: String,
    pub profile: NewProfile,
}

/// Editable contact fields; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub pin_code: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub experience_years: Option<i32>,
}
