//! scenario_link_mode_enforcement
//!
//! Token mode fails closed without a signing secret; plain mode never needs
//! one. Failure tests use sentinel env var names that are never set, so no
//! test mutates the process environment.

use shop_config::{
    load_layered_yaml_from_strings, LinkMode, ShopConfig, DEFAULT_TOKEN_TTL_SECS,
    MAX_TOKEN_TTL_SECS,
};

fn loaded(yaml: &str) -> shop_config::LoadedConfig {
    load_layered_yaml_from_strings(&[yaml]).expect("test yaml must parse cleanly")
}

fn fixture_env(name: &str) -> Option<String> {
    match name {
        "SHOP_T1_SIGNING" => Some("test-signing-secret".to_string()),
        "SHOP_T1_BLANK" => Some("   ".to_string()),
        "SHOP_T1_ADMIN" => Some("admin-key".to_string()),
        _ => None,
    }
}

#[test]
fn token_mode_fails_when_secret_env_missing() {
    let cfg = loaded(
        r#"
app:
  base_url: "https://shop.example"
action_links:
  mode: token
  signing_secret_env: "SHOP_T1_SENTINEL_NEVER_SET_A1"
"#,
    );
    let err = ShopConfig::from_loaded(&cfg).unwrap_err().to_string();
    assert!(err.contains("SECRETS_MISSING"), "got: {err}");
    assert!(err.contains("mode=token"), "got: {err}");
    assert!(err.contains("SHOP_T1_SENTINEL_NEVER_SET_A1"), "got: {err}");
}

#[test]
fn token_mode_treats_blank_secret_as_missing() {
    let cfg = loaded(
        r#"
app:
  base_url: "https://shop.example"
action_links:
  mode: token
  signing_secret_env: "SHOP_T1_BLANK"
"#,
    );
    let err = ShopConfig::from_loaded_with_env(&cfg, fixture_env).unwrap_err();
    assert!(err.to_string().contains("SECRETS_MISSING"));
}

#[test]
fn token_mode_resolves_secret_by_name() {
    let cfg = loaded(
        r#"
app:
  base_url: "https://shop.example"
action_links:
  mode: token
  token_ttl_secs: 300
  signing_secret_env: "SHOP_T1_SIGNING"
admin:
  api_key_env: "SHOP_T1_ADMIN"
"#,
    );
    let shop = ShopConfig::from_loaded_with_env(&cfg, fixture_env).unwrap();
    assert_eq!(shop.link_mode, LinkMode::Token);
    assert_eq!(shop.token_ttl_secs, 300);
    assert_eq!(shop.signing_secret.as_deref(), Some("test-signing-secret"));
    assert_eq!(shop.admin_api_key.as_deref(), Some("admin-key"));
    assert!(shop.notify.webhook_url.is_none());
    assert_eq!(shop.config_hash.as_deref(), Some(cfg.config_hash.as_str()));
}

#[test]
fn plain_mode_is_default_and_needs_no_secret() {
    let cfg = loaded(
        r#"
app:
  base_url: "https://shop.example"
action_links:
  signing_secret_env: "SHOP_T1_SENTINEL_NEVER_SET_B1"
"#,
    );
    let shop = ShopConfig::from_loaded(&cfg).unwrap();
    assert_eq!(shop.link_mode, LinkMode::Plain);
    assert_eq!(shop.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
    assert!(shop.signing_secret.is_none());
}

#[test]
fn missing_base_url_is_rejected() {
    let cfg = loaded("action_links:\n  mode: plain\n");
    let err = ShopConfig::from_loaded(&cfg).unwrap_err().to_string();
    assert!(err.contains("app.base_url"), "got: {err}");
}

#[test]
fn non_positive_ttl_is_rejected() {
    let cfg = loaded(
        r#"
app:
  base_url: "https://shop.example"
action_links:
  token_ttl_secs: 0
"#,
    );
    let err = ShopConfig::from_loaded(&cfg).unwrap_err().to_string();
    assert!(err.contains("token_ttl_secs"), "got: {err}");
}

#[test]
fn ttl_above_one_day_is_rejected() {
    let cfg = loaded(
        r#"
app:
  base_url: "https://shop.example"
action_links:
  token_ttl_secs: 9223372036854775807
"#,
    );
    let err = ShopConfig::from_loaded(&cfg).unwrap_err().to_string();
    assert!(err.contains("token_ttl_secs must be <="), "got: {err}");

    let cfg = loaded(&format!(
        "app:\n  base_url: \"https://shop.example\"\naction_links:\n  token_ttl_secs: {MAX_TOKEN_TTL_SECS}\n"
    ));
    let shop = ShopConfig::from_loaded(&cfg).unwrap();
    assert_eq!(shop.token_ttl_secs, MAX_TOKEN_TTL_SECS);
}
