use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use shop_workflow::{FulfillmentType, OrderStatus};

use crate::model::{NewOrder, OrderRecord, ReasonSlot};
use crate::store::{OrderStore, StoreError};

/// Postgres-backed [`OrderStore`].
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a pending order. Checkout owns this in production; the CLI and
    /// DB-backed tests use it to seed rows.
    pub async fn insert_order(&self, order: &NewOrder) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            insert into orders (
              id, code, status, fulfillment_type, payment_method,
              customer_name, customer_phone, total_cents
            ) values (
              $1, $2, 'pending', $3, $4, $5, $6, $7
            )
            "#,
        )
        .bind(order.id)
        .bind(&order.code)
        .bind(order.fulfillment_type.map(|f| f.as_str()))
        .bind(&order.payment_method)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(order.total_cents)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Read back whichever reason slot is populated, for diagnostics.
    pub async fn fetch_cancellation_reason(&self, id: Uuid) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(
            r#"
            select coalesce(cancellation_reason, metadata ->> 'cancellation_reason') as reason
            from orders
            where id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(r.try_get("reason")?),
            None => Err(StoreError::Missing(id)),
        }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn fetch_order(&self, id: Uuid) -> Result<Option<OrderRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            select id, code, status, fulfillment_type, canceled_at
            from orders
            where id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status: String = row.try_get("status")?;
        let status = status.parse::<OrderStatus>().map_err(|e| StoreError::Corrupt {
            id,
            detail: e.to_string(),
        })?;

        let fulfillment_type = row
            .try_get::<Option<String>, _>("fulfillment_type")?
            .map(|f| f.parse::<FulfillmentType>())
            .transpose()
            .map_err(|e| StoreError::Corrupt {
                id,
                detail: e.to_string(),
            })?;

        Ok(Some(OrderRecord {
            id: row.try_get("id")?,
            code: row.try_get("code")?,
            status,
            fulfillment_type,
            canceled_at: row.try_get("canceled_at")?,
        }))
    }

    async fn commit_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        canceled_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        // Predicated on the status the caller read: a concurrent writer makes
        // this a no-op instead of a lost update.
        let res = sqlx::query(
            r#"
            update orders
            set status = $3,
                canceled_at = coalesce($4, canceled_at),
                updated_at = now()
            where id = $1
              and status = $2
            "#,
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(canceled_at)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn write_reason(
        &self,
        id: Uuid,
        slot: ReasonSlot,
        reason: &str,
    ) -> Result<(), StoreError> {
        let res = match slot {
            // Column names come only from the static REASON_SLOTS list.
            ReasonSlot::Column(column) => {
                let sql = format!("update orders set {column} = $2 where id = $1");
                sqlx::query(&sql)
                    .bind(id)
                    .bind(reason)
                    .execute(&self.pool)
                    .await?
            }
            ReasonSlot::MetadataKey(key) => {
                sqlx::query(
                    r#"
                    update orders
                    set metadata = coalesce(metadata, '{}'::jsonb) || jsonb_build_object($2::text, $3::text)
                    where id = $1
                    "#,
                )
                .bind(id)
                .bind(key)
                .bind(reason)
                .execute(&self.pool)
                .await?
            }
        };

        if res.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }
}
