use std::io::Write;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use uuid::Uuid;

const SECRET_ENV: &str = "SHOPCTL_SCENARIO_LINK_SECRET";

fn write_config(mode: &str) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut f = tempfile::Builder::new().suffix(".yaml").tempfile()?;
    write!(
        f,
        "app:\n  base_url: \"https://shop.example/store\"\n\
         action_links:\n  mode: \"{mode}\"\n  token_ttl_secs: 600\n  signing_secret_env: \"{SECRET_ENV}\"\n"
    )?;
    Ok(f)
}

fn shopctl() -> anyhow::Result<std::process::Command> {
    let mut cmd = std::process::Command::cargo_bin("shopctl")?;
    cmd.env_remove("SHOP_CONFIG").env_remove(SECRET_ENV);
    Ok(cmd)
}

#[test]
fn config_hash_prints_hash_and_canonical_json() -> anyhow::Result<()> {
    let cfg = write_config("plain")?;
    let path = cfg.path().to_string_lossy().to_string();

    shopctl()?
        .args(["config-hash", &path])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("config_hash="))
        .stdout(predicate::str::contains("\"base_url\":\"https://shop.example/store\""));
    Ok(())
}

#[test]
fn plain_link_carries_order_and_action() -> anyhow::Result<()> {
    let cfg = write_config("plain")?;
    let path = cfg.path().to_string_lossy().to_string();
    let id = Uuid::new_v4();

    shopctl()?
        .args([
            "link",
            "--config",
            &path,
            "--order",
            &id.to_string(),
            "--action",
            "dispatch_or_ready",
            "--redirect",
            "/admin/orders",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "https://shop.example/store/api/orders/action?",
        ))
        .stdout(predicate::str::contains(format!("orderId={id}")))
        .stdout(predicate::str::contains("action=dispatch_or_ready"))
        .stdout(predicate::str::contains("redirect=%2Fadmin%2Forders"))
        .stdout(predicate::str::contains("v=json"));
    Ok(())
}

#[test]
fn unknown_action_fails() -> anyhow::Result<()> {
    let cfg = write_config("plain")?;
    let path = cfg.path().to_string_lossy().to_string();

    shopctl()?
        .args([
            "link",
            "--config",
            &path,
            "--order",
            &Uuid::new_v4().to_string(),
            "--action",
            "refund",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown action"));
    Ok(())
}

#[test]
fn token_mode_without_secret_refuses_to_start() -> anyhow::Result<()> {
    let cfg = write_config("token")?;
    let path = cfg.path().to_string_lossy().to_string();

    shopctl()?
        .args([
            "link",
            "--config",
            &path,
            "--order",
            &Uuid::new_v4().to_string(),
            "--action",
            "accept",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SECRETS_MISSING"));
    Ok(())
}

#[test]
fn token_link_verifies_back_to_its_claims() -> anyhow::Result<()> {
    let cfg = write_config("token")?;
    let path = cfg.path().to_string_lossy().to_string();
    let id = Uuid::new_v4();

    let out = shopctl()?
        .env(SECRET_ENV, "cli-scenario-secret")
        .args([
            "link",
            "--config",
            &path,
            "--order",
            &id.to_string(),
            "--action",
            "deny",
            "--json",
        ])
        .output()?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout)?;
    assert_eq!(json["mode"], "token");
    assert_eq!(json["target_status"], "canceled");
    let url = json["url"].as_str().unwrap();
    assert!(!url.contains("orderId="), "{url}");

    let token = url
        .split_once("token=")
        .map(|(_, rest)| rest.split('&').next().unwrap_or_default())
        .unwrap();

    shopctl()?
        .env(SECRET_ENV, "cli-scenario-secret")
        .args(["token", "verify", token, "--config", &path])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("order_id={id}")))
        .stdout(predicate::str::contains("action=deny"));

    shopctl()?
        .env(SECRET_ENV, "a-different-secret")
        .args(["token", "verify", token, "--config", &path])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TOKEN_REJECTED"));
    Ok(())
}
