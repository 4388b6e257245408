use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::servicemodel::{NewService, ServiceFilter, ServiceStatus, ServiceUpdate};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceDto {
    #[validate(length(min = 1, max = 100, message = "Service name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0.01, message = "Base price must be greater than 0"))]
    pub base_price: f64,
    #[validate(range(min = 1, message = "Average duration must be greater than 0"))]
    pub avg_duration: i32,
    pub status: Option<ServiceStatus>,
}

impl From<CreateServiceDto> for NewService {
    fn from(dto: CreateServiceDto) -> Self {
        NewService {
            name: dto.name.trim().to_string(),
            description: dto.description,
            base_price: dto.base_price,
            avg_duration: dto.avg_duration,
            status: dto.status.unwrap_or(ServiceStatus::Active),
            image_path: None,
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateServiceDto {
    #[validate(length(min = 1, max = 100, message = "Service name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.01, message = "Base price must be greater than 0"))]
    pub base_price: Option<f64>,
    #[validate(range(min = 1, message = "Average duration must be greater than 0"))]
    pub avg_duration: Option<i32>,
    pub status: Option<ServiceStatus>,
}

impl From<UpdateServiceDto> for ServiceUpdate {
    fn from(dto: UpdateServiceDto) -> Self {
        ServiceUpdate {
            name: dto.name.map(|n| n.trim().to_string()),
            description: dto.description,
            base_price: dto.base_price,
            avg_duration: dto.avg_duration,
            status: dto.status,
            image_path: None,
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct ServiceSearchQueryDto {
    #[validate(length(max = 100))]
    pub name: Option<String>,
    #[validate(range(min = 0.0))]
    pub min_price: Option<f64>,
    #[validate(range(min = 0.0))]
    pub max_price: Option<f64>,
}

impl ServiceSearchQueryDto {
    pub fn into_filter(self, include_inactive: bool) -> ServiceFilter {
        ServiceFilter {
            name: self.name,
            min_price: self.min_price,
            max_price: self.max_price,
            include_inactive,
        }
    }
}
