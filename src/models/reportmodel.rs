use std::str::FromStr;

use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::requestmodel::RequestStatus;

/// One open request awaiting a professional's action.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct ReminderLine {
    pub pro_id: Uuid,
    pub pro_username: String,
    pub pro_email: Option<String>,
    pub request_id: Uuid,
    pub service_name: Option<String>,
    pub customer_name: String,
    pub request_date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct ActivityLine {
    pub customer_id: Uuid,
    pub customer_username: String,
    pub customer_email: Option<String>,
    pub request_id: Uuid,
    pub service_name: Option<String>,
    pub professional_name: Option<String>,
    pub status: RequestStatus,
    pub request_date: DateTime<Utc>,
    pub completed_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Recipient {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

/// Lines grouped per recipient, in first-seen order.
pub fn group_by_recipient<T, F>(lines: Vec<T>, key: F) -> Vec<(Recipient, Vec<T>)>
where
    F: Fn(&T) -> (Uuid, String, Option<String>),
{
    let mut groups: Vec<(Recipient, Vec<T>)> = Vec::new();
    for line in lines {
        let (user_id, username, email) = key(&line);
        let Some(email) = email else { continue };
        match groups.iter_mut().find(|(r, _)| r.user_id == user_id) {
            Some((_, items)) => items.push(line),
            None => groups.push((Recipient { user_id, username, email }, vec![line])),
        }
    }
    groups
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct StatusCounts {
    pub requested: i64,
    pub assigned: i64,
    pub completed: i64,
    pub cancelled: i64,
}

impl StatusCounts {
    pub fn from_rows(rows: &[(RequestStatus, i64)]) -> Self {
        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            counts.add(*status, *n);
        }
        counts
    }

    pub fn add(&mut self, status: RequestStatus, n: i64) {
        match status {
            RequestStatus::Requested => self.requested += n,
            RequestStatus::Assigned => self.assigned += n,
            RequestStatus::Completed => self.completed += n,
            RequestStatus::Cancelled => self.cancelled += n,
        }
    }

    pub fn total(&self) -> i64 {
        self.requested + self.assigned + self.completed + self.cancelled
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CustomerStats {
    pub counts: StatusCounts,
    pub total_spent: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProfessionalStats {
    pub counts: StatusCounts,
    pub total_earned: f64,
    pub average_rating: f64,
    pub total_reviews: i32,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct RevenueLine {
    pub service_id: Uuid,
    pub service_name: String,
    pub completed_requests: i64,
    pub revenue: f64,
}

/// Month-over-month change in percent; zero when the earlier month had nothing.
pub fn growth_percent(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    (current - previous) as f64 / previous as f64 * 100.0
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CatalogStats {
    pub total_active_services: i64,
    pub new_services_this_month: i64,
    pub services_last_month: i64,
    pub service_growth: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UserStats {
    pub total_professionals: i64,
    pub new_professionals_this_month: i64,
    pub professional_growth: f64,
    pub total_customers: i64,
    pub new_customers_this_month: i64,
    pub customer_growth: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Week,
    Month,
    Year,
}

impl Timeframe {
    pub fn days(&self) -> i64 {
        match self {
            Timeframe::Week => 7,
            Timeframe::Month => 30,
            Timeframe::Year => 365,
        }
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            "year" => Ok(Timeframe::Year),
            other => Err(format!("Invalid timeframe '{}', expected week, month or year", other)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TimeframeRevenue {
    pub timeframe: Timeframe,
    pub since: DateTime<Utc>,
    pub completed_requests: i64,
    pub revenue: f64,
}

/// Signups per week, oldest week first.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UserGrowth {
    pub labels: Vec<String>,
    pub customers: Vec<i64>,
    pub professionals: Vec<i64>,
}

/// Completed requests per service, including services with none.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct UsageLine {
    pub service_id: Uuid,
    pub service_name: String,
    pub completed_requests: i64,
}
