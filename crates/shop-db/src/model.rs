use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use shop_workflow::{FulfillmentType, OrderStatus};

/// The slice of an order the back office reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: Uuid,
    /// Short human-facing code printed on receipts and messages.
    pub code: String,
    pub status: OrderStatus,
    /// `None` for orders created before fulfillment was recorded.
    pub fulfillment_type: Option<FulfillmentType>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl OrderRecord {
    /// Fulfillment for policy purposes; unset means pickup.
    pub fn fulfillment(&self) -> FulfillmentType {
        FulfillmentType::or_default(self.fulfillment_type)
    }
}

/// Row inserted by checkout (and by tests standing in for it).
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub code: String,
    pub fulfillment_type: Option<FulfillmentType>,
    pub payment_method: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub total_cents: i64,
}

/// A place a cancellation reason may be stored.
///
/// Deployments carry different historical schemas; the reason is written to
/// the first slot that accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonSlot {
    /// A text column on `orders`.
    Column(&'static str),
    /// A key inside the `orders.metadata` JSONB document.
    MetadataKey(&'static str),
}

impl fmt::Display for ReasonSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasonSlot::Column(c) => write!(f, "column:{c}"),
            ReasonSlot::MetadataKey(k) => write!(f, "metadata:{k}"),
        }
    }
}

/// Preference order for the cancellation reason.
pub const REASON_SLOTS: &[ReasonSlot] = &[
    ReasonSlot::Column("cancellation_reason"),
    ReasonSlot::Column("cancel_reason"),
    ReasonSlot::Column("denial_reason"),
    ReasonSlot::MetadataKey("cancellation_reason"),
];
