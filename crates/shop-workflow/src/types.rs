//! Closed enumerations shared by every layer of the storefront back office.
//!
//! Wire values are `snake_case` and stable: they are stored in the `orders`
//! table, embedded in action links and signed into action tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// UnknownValue
// ---------------------------------------------------------------------------

/// Returned when a wire string does not name a member of one of the enums
/// in this module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownValue {
    /// Which enumeration was being parsed ("order status", "action", ...).
    pub kind: &'static str,
    pub value: String,
}

// ---------------------------------------------------------------------------
// FulfillmentType
// ---------------------------------------------------------------------------

/// How the customer receives the order. Affects labels only; the state graph
/// is identical for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentType {
    Delivery,
    Pickup,
}

impl FulfillmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentType::Delivery => "delivery",
            FulfillmentType::Pickup => "pickup",
        }
    }

    /// Orders created without a fulfillment type are treated as pickup.
    pub fn or_default(stored: Option<FulfillmentType>) -> FulfillmentType {
        stored.unwrap_or(FulfillmentType::Pickup)
    }
}

impl FromStr for FulfillmentType {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(FulfillmentType::Delivery),
            "pickup" => Ok(FulfillmentType::Pickup),
            other => Err(UnknownValue {
                kind: "fulfillment type",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for FulfillmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an order.
///
/// ```text
/// pending ──accept──> in_preparation ──dispatch──> out_for_delivery_or_ready ──complete──> delivered
///    └──deny──> canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created by checkout, waiting for staff.
    Pending,
    InPreparation,
    /// "Out for delivery" or "ready for pickup" depending on fulfillment.
    OutForDeliveryOrReady,
    /// **Terminal.**
    Delivered,
    /// **Terminal.** Only reachable from `Pending`.
    Canceled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::InPreparation,
        OrderStatus::OutForDeliveryOrReady,
        OrderStatus::Delivered,
        OrderStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InPreparation => "in_preparation",
            OrderStatus::OutForDeliveryOrReady => "out_for_delivery_or_ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Canceled => "canceled",
        }
    }

    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }

    /// Human-facing label. The stored value never depends on fulfillment.
    pub fn label(&self, fulfillment: FulfillmentType) -> &'static str {
        match (self, fulfillment) {
            (OrderStatus::Pending, _) => "Pending",
            (OrderStatus::InPreparation, _) => "In preparation",
            (OrderStatus::OutForDeliveryOrReady, FulfillmentType::Delivery) => "Out for delivery",
            (OrderStatus::OutForDeliveryOrReady, FulfillmentType::Pickup) => "Ready for pickup",
            (OrderStatus::Delivered, FulfillmentType::Delivery) => "Delivered",
            (OrderStatus::Delivered, FulfillmentType::Pickup) => "Picked up",
            (OrderStatus::Canceled, _) => "Canceled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownValue {
                kind: "order status",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A staff-initiated intent. Each action drives exactly one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Accept,
    Deny,
    /// Dispatch a delivery, or mark a pickup order as ready.
    DispatchOrReady,
    Complete,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::Accept,
        Action::Deny,
        Action::DispatchOrReady,
        Action::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Accept => "accept",
            Action::Deny => "deny",
            Action::DispatchOrReady => "dispatch_or_ready",
            Action::Complete => "complete",
        }
    }

    /// Button/link caption shown to staff.
    pub fn label(&self, fulfillment: FulfillmentType) -> &'static str {
        match (self, fulfillment) {
            (Action::Accept, _) => "Accept",
            (Action::Deny, _) => "Deny",
            (Action::DispatchOrReady, FulfillmentType::Delivery) => "Send out for delivery",
            (Action::DispatchOrReady, FulfillmentType::Pickup) => "Mark ready for pickup",
            (Action::Complete, FulfillmentType::Delivery) => "Mark delivered",
            (Action::Complete, FulfillmentType::Pickup) => "Mark picked up",
        }
    }
}

impl FromStr for Action {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownValue {
                kind: "action",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
