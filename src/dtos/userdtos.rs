use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    documentmodel::{Document, DocumentType},
    usermodel::*,
};

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 3, max = 80, message = "Username must be 3-80 characters"))]
    pub username: String,
    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    /// `customer` or `professional`.
    pub role: String,
    #[validate(length(min = 10, max = 15, message = "Phone number must be 10-15 digits"))]
    pub phone_number: String,
    #[validate(length(min = 4, max = 10, message = "Pin code must be 4-10 characters"))]
    pub pin_code: String,
    #[validate(length(min = 1, max = 200, message = "Address cannot be empty"))]
    pub address: Option<String>,
    pub service_type_id: Option<Uuid>,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 80, message = "Experience must be between 0 and 80 years"))]
    pub experience_years: Option<i32>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RefreshTokenDto {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub token: String,
    pub refresh_token: Option<String>,
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FilterUserDto {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub full_name: String,
    pub role: String,
    pub approved: bool,
    pub active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.to_str().to_string(),
            approved: user.approved,
            active: user.active,
            created_at: user.created_at,
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct IdentityDto {
    pub user: FilterUserDto,
    pub profile: RoleProfile,
}

impl From<&Identity> for IdentityDto {
    fn from(identity: &Identity) -> Self {
        IdentityDto {
            user: FilterUserDto::filter_user(&identity.user),
            profile: identity.profile.clone(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ProfessionalDto {
    pub user: FilterUserDto,
    pub profile: ProfessionalProfile,
}

impl From<&Professional> for ProfessionalDto {
    fn from(pro: &Professional) -> Self {
        ProfessionalDto {
            user: FilterUserDto::filter_user(&pro.user),
            profile: pro.profile.clone(),
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, max = 100, message = "Full name cannot be empty"))]
    pub full_name: Option<String>,
    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,
    #[validate(length(min = 10, max = 15, message = "Phone number must be 10-15 digits"))]
    pub phone_number: Option<String>,
    #[validate(length(min = 4, max = 10, message = "Pin code must be 4-10 characters"))]
    pub pin_code: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Address cannot be empty"))]
    pub address: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 80, message = "Experience must be between 0 and 80 years"))]
    pub experience_years: Option<i32>,
}

impl From<UpdateProfileDto> for ProfileUpdate {
    fn from(dto: UpdateProfileDto) -> Self {
        ProfileUpdate {
            full_name: dto.full_name,
            email: dto.email,
            phone_number: dto.phone_number,
            pin_code: dto.pin_code,
            address: dto.address,
            description: dto.description,
            experience_years: dto.experience_years,
        }
    }
}

#[derive(Validate, Debug, Default, Serialize, Deserialize)]
pub struct UserListQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
    #[validate(length(max = 100))]
    pub search: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RejectUserDto {
    #[validate(length(min = 1, max = 500, message = "Reason cannot be empty"))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VerifyDocumentDto {
    pub verified: bool,
}

#[derive(Debug, Serialize, Clone)]
pub struct DocumentVerificationDto {
    pub document: Document,
    pub documents_verified: bool,
}

#[derive(Debug, Serialize, Clone)]
pub struct ProfessionalStatusDto {
    pub approved: bool,
    pub active: bool,
    pub documents_verified: bool,
    pub rejection_reason: Option<String>,
    pub missing_documents: Vec<DocumentType>,
    pub unverified_documents: Vec<DocumentType>,
}
