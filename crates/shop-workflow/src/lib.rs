//! shop-workflow
//!
//! Order status vocabulary and the transition policy that governs it.
//!
//! - [`types`] holds the closed enumerations (status, fulfillment, action)
//!   and their wire/display representations.
//! - [`policy`] holds the pure functions deciding which transitions are legal
//!   and which actions staff should be offered.
//!
//! Nothing here performs I/O. The daemon and link builder both consult this
//! crate; the daemon additionally treats [`TransitionError`] as the
//! authoritative guard at the point of mutation.

mod policy;
mod types;

pub use policy::{
    allowed_actions_for_display, can_transition, check_transition, next_status_for_action,
    TransitionError,
};
pub use types::{Action, FulfillmentType, OrderStatus, UnknownValue};
