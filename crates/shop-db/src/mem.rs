//! In-memory [`OrderStore`] for scenario tests (feature `testkit`).
//!
//! Knobs:
//! - which reason slots "exist" in the simulated schema;
//! - forced failure of the mandatory status write;
//! - a one-shot concurrent status change applied just before the next
//!   `commit_status`, to exercise the compare-and-swap path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shop_workflow::{FulfillmentType, OrderStatus};

use crate::model::{OrderRecord, ReasonSlot, REASON_SLOTS};
use crate::store::{OrderStore, StoreError};

#[derive(Debug, Clone)]
struct MemRow {
    record: OrderRecord,
    reason: Option<(ReasonSlot, String)>,
}

#[derive(Debug)]
pub struct MemOrderStore {
    rows: RwLock<HashMap<Uuid, MemRow>>,
    accepted_slots: Vec<ReasonSlot>,
    fail_status_writes: AtomicBool,
    status_writes: AtomicUsize,
    concurrent_change: RwLock<Option<(Uuid, OrderStatus)>>,
}

impl Default for MemOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemOrderStore {
    /// Every slot in [`REASON_SLOTS`] accepts writes.
    pub fn new() -> Self {
        Self::with_reason_slots(REASON_SLOTS.to_vec())
    }

    /// Only `slots` accept reason writes; pass an empty vec to reject all.
    pub fn with_reason_slots(slots: Vec<ReasonSlot>) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            accepted_slots: slots,
            fail_status_writes: AtomicBool::new(false),
            status_writes: AtomicUsize::new(0),
            concurrent_change: RwLock::new(None),
        }
    }

    /// Insert an order in `status` and return its id.
    pub async fn seed(
        &self,
        code: &str,
        status: OrderStatus,
        fulfillment_type: Option<FulfillmentType>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let record = OrderRecord {
            id,
            code: code.to_string(),
            status,
            fulfillment_type,
            canceled_at: None,
        };
        self.rows.write().await.insert(
            id,
            MemRow {
                record,
                reason: None,
            },
        );
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<OrderRecord> {
        self.rows.read().await.get(&id).map(|r| r.record.clone())
    }

    /// Stored reason and the slot that took it.
    pub async fn reason(&self, id: Uuid) -> Option<(ReasonSlot, String)> {
        self.rows.read().await.get(&id).and_then(|r| r.reason.clone())
    }

    pub fn fail_status_writes(&self, fail: bool) {
        self.fail_status_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of status writes that actually changed a row.
    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }

    /// Before the next `commit_status`, pretend another request moved `id`
    /// to `status`.
    pub async fn race_next_commit(&self, id: Uuid, status: OrderStatus) {
        *self.concurrent_change.write().await = Some((id, status));
    }
}

#[async_trait]
impl OrderStore for MemOrderStore {
    async fn fetch_order(&self, id: Uuid) -> Result<Option<OrderRecord>, StoreError> {
        Ok(self.get(id).await)
    }

    async fn commit_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        canceled_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        if self.fail_status_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("status write refused".to_string()));
        }

        let mut rows = self.rows.write().await;

        if let Some((race_id, race_status)) = self.concurrent_change.write().await.take() {
            if let Some(row) = rows.get_mut(&race_id) {
                row.record.status = race_status;
            }
        }

        let Some(row) = rows.get_mut(&id) else {
            return Ok(false);
        };
        if row.record.status != expected {
            return Ok(false);
        }

        row.record.status = next;
        if canceled_at.is_some() {
            row.record.canceled_at = canceled_at;
        }
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn write_reason(
        &self,
        id: Uuid,
        slot: ReasonSlot,
        reason: &str,
    ) -> Result<(), StoreError> {
        if !self.accepted_slots.contains(&slot) {
            return Err(StoreError::Unavailable(format!("no such slot: {slot}")));
        }
        let mut rows = self.rows.write().await;
        let row = rows.get_mut(&id).ok_or(StoreError::Missing(id))?;
        row.reason = Some((slot, reason.to_string()));
        Ok(())
    }
}
