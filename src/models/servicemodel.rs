use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "service_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Active,
    Inactive,
}

impl ServiceStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ServiceStatus::Active => "active",
            ServiceStatus::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub base_price: f64,
    /// Average duration in minutes.
    pub avg_duration: i32,
    pub status: ServiceStatus,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Service {
    pub fn is_active(&self) -> bool {
        self.status == ServiceStatus::Active
    }
}

#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub description: String,
    pub base_price: f64,
    pub avg_duration: i32,
    pub status: ServiceStatus,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<f64>,
    pub avg_duration: Option<i32>,
    pub status: Option<ServiceStatus>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceFilter {
    pub name: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub include_inactive: bool,
}

impl ServiceFilter {
    pub fn matches(&self, service: &Service) -> bool {
        if !self.include_inactive && !service.is_active() {
            return false;
        }
        if let Some(name) = &self.name {
            if !service.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if service.base_price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if service.base_price > max {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceDeletion {
    Deleted,
    /// Number of requested/assigned requests still pointing at the service.
    InUse(i64),
    Missing,
}
