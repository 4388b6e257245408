use std::fmt;

use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Requested,
    Assigned,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn to_str(&self) -> &str {
        match self {
            RequestStatus::Requested => "requested",
            RequestStatus::Assigned => "assigned",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }

    pub fn open() -> Vec<RequestStatus> {
        vec![RequestStatus::Requested, RequestStatus::Assigned]
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "cancelled_by", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Customer,
    Professional,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub service_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub pro_id: Option<Uuid>,
    pub status: RequestStatus,
    pub notes: Option<String>,
    pub request_date: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
    pub assigned_date: Option<DateTime<Utc>>,
    pub completed_on: Option<DateTime<Utc>>,
    pub cancelled_on: Option<DateTime<Utc>>,
    pub cancelled_by: Option<CancelledBy>,
}

#[derive(Debug, Clone)]
pub struct NewServiceRequest {
    pub service_id: Uuid,
    pub customer_id: Uuid,
    pub pro_id: Option<Uuid>,
    pub notes: Option<String>,
    pub completion_date: Option<DateTime<Utc>>,
    pub request_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestAction {
    Accept,
    Reject,
    Complete,
    Cancel,
    MarkCompleted,
    RevertToAssigned,
    Edit,
    Review,
}

impl RequestAction {
    pub fn to_str(&self) -> &str {
        match self {
            RequestAction::Accept => "accept",
            RequestAction::Reject => "reject",
            RequestAction::Complete => "complete",
            RequestAction::Cancel => "cancel",
            RequestAction::MarkCompleted => "mark_completed",
            RequestAction::RevertToAssigned => "revert_to_assigned",
            RequestAction::Edit => "edit",
            RequestAction::Review => "review",
        }
    }
}

impl fmt::Display for RequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Condition on the professional binding that must hold at write time.
#[derive(Debug, Clone, PartialEq)]
pub enum ProGuard {
    Any,
    /// `pro_id` must equal the given professional.
    Owner(Uuid),
    /// Some professional must already be bound.
    Bound,
    /// Unbound requests for the given service type, or ones already bound to `pro`.
    Claimable { pro: Uuid, service_type: Option<Uuid> },
}

impl ProGuard {
    pub fn admits(&self, request: &ServiceRequest) -> bool {
        match self {
            ProGuard::Any => true,
            ProGuard::Owner(pro) => request.pro_id == Some(*pro),
            ProGuard::Bound => request.pro_id.is_some(),
            ProGuard::Claimable { pro, service_type } => {
                request.pro_id == Some(*pro)
                    || (request.pro_id.is_none()
                        && service_type.is_some()
                        && request.service_id == *service_type)
            }
        }
    }
}

/// Timestamp side effect applied in the same write as the status change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stamp {
    Assigned,
    Completed,
    Cancelled(CancelledBy),
    ClearCompleted,
}

/// A compare-and-swap on a request's status.
#[derive(Debug, Clone)]
pub struct Transition {
    pub action: RequestAction,
    pub from: Vec<RequestStatus>,
    pub to: RequestStatus,
    pub customer: Option<Uuid>,
    pub pro_guard: ProGuard,
    /// Written to `pro_id` on success.
    pub bind_pro: Option<Uuid>,
    pub stamp: Stamp,
    pub at: DateTime<Utc>,
}

impl Transition {
    pub fn admits(&self, request: &ServiceRequest) -> bool {
        self.from.contains(&request.status)
            && self.customer.map_or(true, |c| c == request.customer_id)
            && self.pro_guard.admits(request)
    }

    /// Applies the transition to an in-memory copy of the row.
    pub fn apply_to(&self, request: &mut ServiceRequest) {
        request.status = self.to;
        if let Some(pro) = self.bind_pro {
            request.pro_id = Some(pro);
        }
        match self.stamp {
            Stamp::Assigned => request.assigned_date = Some(self.at),
            Stamp::Completed => request.completed_on = Some(self.at),
            Stamp::Cancelled(by) => {
                request.cancelled_on = Some(self.at);
                request.cancelled_by = Some(by);
            }
            Stamp::ClearCompleted => request.completed_on = None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestEdit {
    pub service_id: Option<Uuid>,
    pub notes: Option<String>,
    pub completion_date: Option<DateTime<Utc>>,
}

impl RequestEdit {
    pub fn is_empty(&self) -> bool {
        self.service_id.is_none() && self.notes.is_none() && self.completion_date.is_none()
    }

    /// Statuses in which this edit may be written.
    pub fn allowed_from(&self) -> Vec<RequestStatus> {
        if self.service_id.is_some() {
            vec![RequestStatus::Requested]
        } else {
            RequestStatus::open()
        }
    }

    pub fn apply_to(&self, request: &mut ServiceRequest) {
        if let Some(service_id) = self.service_id {
            request.service_id = Some(service_id);
        }
        if let Some(notes) = &self.notes {
            request.notes = Some(notes.clone());
        }
        if let Some(date) = self.completion_date {
            request.completion_date = Some(date);
        }
    }
}

/// Result of a conditional write against a request row.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied(ServiceRequest),
    /// The guard did not hold; carries the row as it currently stands.
    Rejected(ServiceRequest),
    Missing,
}
