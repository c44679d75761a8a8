use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use shop_workflow::OrderStatus;

use crate::model::{OrderRecord, ReasonSlot, REASON_SLOTS};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("db error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("order {id} has an unreadable row: {detail}")]
    Corrupt { id: Uuid, detail: String },
    #[error("order {0} not found")]
    Missing(Uuid),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistence collaborator of the order action endpoint.
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    async fn fetch_order(&self, id: Uuid) -> Result<Option<OrderRecord>, StoreError>;

    /// Move `id` from `expected` to `next`, setting `canceled_at` when given.
    ///
    /// Returns `Ok(false)` when the row no longer has status `expected`
    /// (or no longer exists); nothing is written in that case.
    async fn commit_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        canceled_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError>;

    /// Write `reason` into one slot. Fails if the slot does not exist in this
    /// deployment's schema.
    async fn write_reason(&self, id: Uuid, slot: ReasonSlot, reason: &str)
        -> Result<(), StoreError>;
}

/// Try every slot in [`REASON_SLOTS`] order, stopping at the first that
/// accepts the write. Failures are logged and swallowed; `None` means no slot
/// took the reason.
pub async fn persist_reason_best_effort(
    store: &dyn OrderStore,
    id: Uuid,
    reason: &str,
) -> Option<ReasonSlot> {
    for slot in REASON_SLOTS {
        match store.write_reason(id, *slot, reason).await {
            Ok(()) => {
                debug!(order_id = %id, slot = %slot, "cancellation reason stored");
                return Some(*slot);
            }
            Err(e) => {
                debug!(order_id = %id, slot = %slot, error = %e, "reason slot rejected write");
            }
        }
    }
    warn!(order_id = %id, "cancellation reason dropped: no slot accepted the write");
    None
}
