//! shop-db
//!
//! Order persistence as seen by the back office: read a narrow slice of an
//! order, conditionally move its status, and best-effort attach a
//! cancellation reason.
//!
//! - [`OrderStore`] is the seam the daemon depends on.
//! - [`PgOrderStore`] is the Postgres implementation.
//! - `MemOrderStore` (feature `testkit`) is the in-memory implementation used
//!   by scenario tests.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod model;
mod pg;
mod store;

#[cfg(feature = "testkit")]
mod mem;

pub use model::{NewOrder, OrderRecord, ReasonSlot, REASON_SLOTS};
pub use pg::PgOrderStore;
pub use store::{persist_reason_best_effort, OrderStore, StoreError};

#[cfg(feature = "testkit")]
pub use mem::MemOrderStore;

pub const ENV_DB_URL: &str = "SHOP_DATABASE_URL";

/// Connect to Postgres using SHOP_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_orders_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
}
