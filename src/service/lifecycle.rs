//! Transition table for service requests.
//!
//! `plan` turns an actor's action into a guarded [`Transition`]; the store applies
//! it as a single compare-and-swap so concurrent writers cannot both win.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::ServiceError;
use crate::models::requestmodel::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Actor {
    Customer(Uuid),
    Professional {
        id: Uuid,
        service_type: Option<Uuid>,
    },
}

pub fn plan(actor: Actor, action: RequestAction, at: DateTime<Utc>) -> Result<Transition, ServiceError> {
    use RequestStatus::*;

    let (from, to, customer, pro_guard, bind_pro, stamp) = match (actor, action) {
        (Actor::Professional { id, service_type }, RequestAction::Accept) => (
            vec![Requested],
            Assigned,
            None,
            ProGuard::Claimable { pro: id, service_type },
            Some(id),
            Stamp::Assigned,
        ),
        (Actor::Professional { id, .. }, RequestAction::Reject) => (
            vec![Requested, Assigned],
            Cancelled,
            None,
            ProGuard::Owner(id),
            None,
            Stamp::Cancelled(CancelledBy::Professional),
        ),
        (Actor::Professional { id, .. }, RequestAction::Complete) => (
            vec![Assigned],
            Completed,
            None,
            ProGuard::Owner(id),
            None,
            Stamp::Completed,
        ),
        (Actor::Customer(id), RequestAction::Cancel) => (
            RequestStatus::open(),
            Cancelled,
            Some(id),
            ProGuard::Any,
            None,
            Stamp::Cancelled(CancelledBy::Customer),
        ),
        (Actor::Customer(id), RequestAction::MarkCompleted) => (
            RequestStatus::open(),
            Completed,
            Some(id),
            ProGuard::Any,
            None,
            Stamp::Completed,
        ),
        (Actor::Customer(id), RequestAction::RevertToAssigned) => (
            vec![Completed],
            Assigned,
            Some(id),
            ProGuard::Bound,
            None,
            Stamp::ClearCompleted,
        ),
        (_, action) => {
            return Err(ServiceError::Validation(format!(
                "Action '{}' is not available to this role",
                action
            )))
        }
    };

    Ok(Transition {
        action,
        from,
        to,
        customer,
        pro_guard,
        bind_pro,
        stamp,
        at,
    })
}

/// Explains why a guarded write did not apply, given the row as it stands now.
pub fn rejection(transition: &Transition, current: &ServiceRequest) -> ServiceError {
    if transition.from.contains(&current.status) {
        if transition.customer.map_or(false, |c| c != current.customer_id) {
            return ServiceError::not_found("Service request");
        }
        if transition.pro_guard == ProGuard::Bound && current.pro_id.is_none() {
            return ServiceError::Validation(
                "No professional is bound to this request, so it cannot return to assigned"
                    .to_string(),
            );
        }
        return ServiceError::Authorization(
            "This service request is not available to you".to_string(),
        );
    }
    ServiceError::InvalidTransition {
        current: current.status,
        action: transition.action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [RequestStatus; 4] = [
        RequestStatus::Requested,
        RequestStatus::Assigned,
        RequestStatus::Completed,
        RequestStatus::Cancelled,
    ];

    fn request(status: RequestStatus, customer: Uuid, pro: Option<Uuid>, service: Uuid) -> ServiceRequest {
        ServiceRequest {
            id: Uuid::new_v4(),
            service_id: Some(service),
            customer_id: customer,
            pro_id: pro,
            status,
            notes: None,
            request_date: Utc::now(),
            completion_date: None,
            assigned_date: None,
            completed_on: None,
            cancelled_on: None,
            cancelled_by: None,
        }
    }

    fn every_plan(customer: Uuid, pro: Uuid, service: Uuid) -> Vec<Transition> {
        let customer = Actor::Customer(customer);
        let pro = Actor::Professional {
            id: pro,
            service_type: Some(service),
        };
        [
            (pro, RequestAction::Accept),
            (pro, RequestAction::Reject),
            (pro, RequestAction::Complete),
            (customer, RequestAction::Cancel),
            (customer, RequestAction::MarkCompleted),
            (customer, RequestAction::RevertToAssigned),
        ]
        .into_iter()
        .map(|(actor, action)| plan(actor, action, Utc::now()).unwrap())
        .collect()
    }

    #[test]
    fn terminal_states_only_allow_the_documented_reversal() {
        let (customer, pro, service) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        for status in [RequestStatus::Completed, RequestStatus::Cancelled] {
            let current = request(status, customer, Some(pro), service);
            for transition in every_plan(customer, pro, service) {
                let allowed = transition.admits(&current);
                let is_reversal = status == RequestStatus::Completed
                    && transition.action == RequestAction::RevertToAssigned;
                assert_eq!(allowed, is_reversal, "{:?} from {:?}", transition.action, status);
            }
        }
    }

    #[test]
    fn open_states_follow_the_table() {
        let (customer, pro, service) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let expectations = [
            (RequestAction::Accept, vec![RequestStatus::Requested]),
            (RequestAction::Reject, vec![RequestStatus::Requested, RequestStatus::Assigned]),
            (RequestAction::Complete, vec![RequestStatus::Assigned]),
            (RequestAction::Cancel, vec![RequestStatus::Requested, RequestStatus::Assigned]),
            (RequestAction::MarkCompleted, vec![RequestStatus::Requested, RequestStatus::Assigned]),
            (RequestAction::RevertToAssigned, vec![RequestStatus::Completed]),
        ];
        let plans = every_plan(customer, pro, service);
        for (action, allowed_from) in expectations {
            let transition = plans.iter().find(|t| t.action == action).unwrap();
            for status in ALL_STATUSES {
                let current = request(status, customer, Some(pro), service);
                assert_eq!(transition.admits(&current), allowed_from.contains(&status));
            }
        }
    }

    #[test]
    fn accept_claims_unbound_requests_for_own_service_type_only() {
        let (customer, pro, service) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let accept = plan(
            Actor::Professional { id: pro, service_type: Some(service) },
            RequestAction::Accept,
            Utc::now(),
        )
        .unwrap();

        assert!(accept.admits(&request(RequestStatus::Requested, customer, None, service)));
        assert!(!accept.admits(&request(RequestStatus::Requested, customer, None, Uuid::new_v4())));
        assert!(!accept.admits(&request(
            RequestStatus::Requested,
            customer,
            Some(Uuid::new_v4()),
            service
        )));
    }

    #[test]
    fn applying_sets_status_and_timestamp_together() {
        let (customer, pro, service) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let at = Utc::now();
        let mut current = request(RequestStatus::Requested, customer, None, service);

        plan(Actor::Professional { id: pro, service_type: Some(service) }, RequestAction::Accept, at)
            .unwrap()
            .apply_to(&mut current);
        assert_eq!(current.status, RequestStatus::Assigned);
        assert_eq!(current.pro_id, Some(pro));
        assert_eq!(current.assigned_date, Some(at));

        plan(Actor::Customer(customer), RequestAction::MarkCompleted, at)
            .unwrap()
            .apply_to(&mut current);
        assert_eq!(current.completed_on, Some(at));

        plan(Actor::Customer(customer), RequestAction::RevertToAssigned, at)
            .unwrap()
            .apply_to(&mut current);
        assert_eq!(current.status, RequestStatus::Assigned);
        assert_eq!(current.completed_on, None);
    }

    #[test]
    fn roles_cannot_borrow_each_others_actions() {
        let customer = Actor::Customer(Uuid::new_v4());
        assert!(matches!(
            plan(customer, RequestAction::Accept, Utc::now()),
            Err(ServiceError::Validation(_))
        ));
        let pro = Actor::Professional { id: Uuid::new_v4(), service_type: None };
        assert!(matches!(
            plan(pro, RequestAction::Cancel, Utc::now()),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn revert_needs_a_bound_professional() {
        let (customer, service) = (Uuid::new_v4(), Uuid::new_v4());
        let at = Utc::now();
        let mut unbound = request(RequestStatus::Requested, customer, None, service);

        let finish = plan(Actor::Customer(customer), RequestAction::MarkCompleted, at).unwrap();
        assert!(finish.admits(&unbound));
        finish.apply_to(&mut unbound);

        let revert = plan(Actor::Customer(customer), RequestAction::RevertToAssigned, at).unwrap();
        assert!(!revert.admits(&unbound));
        assert!(matches!(rejection(&revert, &unbound), ServiceError::Validation(_)));
    }

    #[test]
    fn rejection_names_current_status_and_action() {
        let (customer, pro, service) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let complete = plan(
            Actor::Professional { id: pro, service_type: Some(service) },
            RequestAction::Complete,
            Utc::now(),
        )
        .unwrap();
        let current = request(RequestStatus::Cancelled, customer, Some(pro), service);
        match rejection(&complete, &current) {
            ServiceError::InvalidTransition { current, action } => {
                assert_eq!(current, RequestStatus::Cancelled);
                assert_eq!(action, RequestAction::Complete);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let someone_elses = request(RequestStatus::Assigned, customer, Some(Uuid::new_v4()), service);
        assert!(matches!(
            rejection(&complete, &someone_elses),
            ServiceError::Authorization(_)
        ));
    }
}
