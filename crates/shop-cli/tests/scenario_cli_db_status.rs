use assert_cmd::prelude::*;
use predicates::prelude::*;

/// `shopctl db migrate` then `db status` report an orders table.
///
/// DB-backed; skipped if SHOP_DATABASE_URL is not set.
#[test]
fn cli_migrate_then_status_reports_orders_table() -> anyhow::Result<()> {
    let url = match std::env::var(shop_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: SHOP_DATABASE_URL not set");
            return Ok(());
        }
    };

    std::process::Command::cargo_bin("shopctl")?
        .env(shop_db::ENV_DB_URL, &url)
        .args(["db", "migrate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("migrations_applied=true"));

    std::process::Command::cargo_bin("shopctl")?
        .env(shop_db::ENV_DB_URL, &url)
        .args(["db", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("db_ok=true has_orders_table=true"));
    Ok(())
}
