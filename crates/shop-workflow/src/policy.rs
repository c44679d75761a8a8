//! Status transition policy.
//!
//! Two questions are answered separately:
//!
//! 1. **Display** ([`allowed_actions_for_display`]): which actions should a
//!    human be offered for an order right now.
//! 2. **Legality** ([`can_transition`], [`check_transition`]): may the order
//!    actually move from one status to another. This is the guard enforced
//!    at the point of mutation; a stale link that was correct when issued is
//!    still rejected here.
//!
//! Self-transitions are always legal so a repeated click is a no-op rather
//! than an error.

use crate::types::{Action, FulfillmentType, OrderStatus};

// ---------------------------------------------------------------------------
// TransitionError
// ---------------------------------------------------------------------------

/// An order cannot move from `from` to `to`.
///
/// The message names both statuses; it is surfaced to operators verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal order transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

// ---------------------------------------------------------------------------
// Policy functions
// ---------------------------------------------------------------------------

/// Target status for an action. Independent of the order's current state.
pub fn next_status_for_action(action: Action) -> OrderStatus {
    match action {
        Action::Accept => OrderStatus::InPreparation,
        Action::Deny => OrderStatus::Canceled,
        Action::DispatchOrReady => OrderStatus::OutForDeliveryOrReady,
        Action::Complete => OrderStatus::Delivered,
    }
}

/// Whether `from -> to` is a legal move.
///
/// `fulfillment` does not branch the graph: delivery and pickup share the
/// `in_preparation -> out_for_delivery_or_ready` edge.
pub fn can_transition(from: OrderStatus, to: OrderStatus, _fulfillment: FulfillmentType) -> bool {
    use OrderStatus::*;

    if from == to {
        return true;
    }

    matches!(
        (from, to),
        (Pending, InPreparation)
            | (Pending, Canceled)
            | (InPreparation, OutForDeliveryOrReady)
            | (OutForDeliveryOrReady, Delivered)
    )
}

/// [`can_transition`] as a `Result`, for `?` at the mutation boundary.
pub fn check_transition(
    from: OrderStatus,
    to: OrderStatus,
    fulfillment: FulfillmentType,
) -> Result<(), TransitionError> {
    if can_transition(from, to, fulfillment) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

/// Actions staff should be offered for an order in `status`.
pub fn allowed_actions_for_display(
    status: OrderStatus,
    _fulfillment: FulfillmentType,
) -> &'static [Action] {
    match status {
        OrderStatus::Pending => &[Action::Accept, Action::Deny],
        OrderStatus::InPreparation => &[Action::DispatchOrReady],
        OrderStatus::OutForDeliveryOrReady => &[Action::Complete],
        OrderStatus::Delivered | OrderStatus::Canceled => &[],
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    const BOTH: [FulfillmentType; 2] = [FulfillmentType::Delivery, FulfillmentType::Pickup];

    #[test]
    fn action_targets() {
        assert_eq!(next_status_for_action(Action::Accept), InPreparation);
        assert_eq!(next_status_for_action(Action::Deny), Canceled);
        assert_eq!(
            next_status_for_action(Action::DispatchOrReady),
            OutForDeliveryOrReady
        );
        assert_eq!(next_status_for_action(Action::Complete), Delivered);
    }

    #[test]
    fn legal_edges_are_exactly_the_linear_chain_plus_deny() {
        let legal = [
            (Pending, InPreparation),
            (Pending, Canceled),
            (InPreparation, OutForDeliveryOrReady),
            (OutForDeliveryOrReady, Delivered),
        ];
        for ft in BOTH {
            for from in OrderStatus::ALL {
                for to in OrderStatus::ALL {
                    let expected = from == to || legal.contains(&(from, to));
                    assert_eq!(
                        can_transition(from, to, ft),
                        expected,
                        "{from} -> {to} ({ft})"
                    );
                }
            }
        }
    }

    #[test]
    fn self_transition_is_always_legal() {
        for st in OrderStatus::ALL {
            assert!(check_transition(st, st, FulfillmentType::Pickup).is_ok());
        }
    }

    #[test]
    fn terminal_states_are_sticky() {
        for term in [Delivered, Canceled] {
            assert!(term.is_terminal());
            for to in OrderStatus::ALL.into_iter().filter(|s| *s != term) {
                let err = check_transition(term, to, FulfillmentType::Delivery).unwrap_err();
                assert_eq!(err.from, term);
                assert_eq!(err.to, to);
            }
        }
    }

    #[test]
    fn accepted_order_cannot_be_denied() {
        assert!(!can_transition(InPreparation, Canceled, FulfillmentType::Delivery));
    }

    #[test]
    fn error_message_names_both_statuses() {
        let err = check_transition(Delivered, InPreparation, FulfillmentType::Delivery).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("delivered"), "{msg}");
        assert!(msg.contains("in_preparation"), "{msg}");
    }

    #[test]
    fn display_policy_per_status() {
        for ft in BOTH {
            assert_eq!(
                allowed_actions_for_display(Pending, ft),
                &[Action::Accept, Action::Deny]
            );
            assert_eq!(
                allowed_actions_for_display(InPreparation, ft),
                &[Action::DispatchOrReady]
            );
            assert_eq!(
                allowed_actions_for_display(OutForDeliveryOrReady, ft),
                &[Action::Complete]
            );
            assert!(allowed_actions_for_display(Delivered, ft).is_empty());
            assert!(allowed_actions_for_display(Canceled, ft).is_empty());
        }
    }

    #[test]
    fn every_displayed_action_is_a_legal_transition() {
        for ft in BOTH {
            for st in OrderStatus::ALL {
                for action in allowed_actions_for_display(st, ft) {
                    let to = next_status_for_action(*action);
                    assert!(can_transition(st, to, ft), "{st} offers {action}");
                }
            }
        }
    }
}
