//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `"SHOP_ACTION_LINK_SECRET"`).
//! - At startup, callers invoke [`resolve_secrets`] once and pass the result
//!   into [`crate::ShopConfig`]; no other code reads these env vars.
//! - `Debug` on [`ResolvedSecrets`] redacts values.
//! - Error messages reference the env var **NAME**, never the value.
//!
//! # Mode-aware enforcement
//! - `token`: the action-link signing secret is **required**.
//! - `plain`: the signing secret is optional and unused.
//!
//! The admin API key and the notification webhook are optional in both modes.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::settings::LinkMode;

pub const DEFAULT_SIGNING_SECRET_ENV: &str = "SHOP_ACTION_LINK_SECRET";
pub const DEFAULT_ADMIN_API_KEY_ENV: &str = "SHOP_ADMIN_API_KEY";
pub const DEFAULT_NOTIFY_WEBHOOK_ENV: &str = "SHOP_NOTIFY_WEBHOOK_URL";

/// All secrets the back office needs, resolved once.
#[derive(Clone, Default)]
pub struct ResolvedSecrets {
    /// HMAC key for action tokens. `None` if the named env var was absent or empty.
    pub signing_secret: Option<String>,
    /// Shared key guarding the admin link/notify routes.
    pub admin_api_key: Option<String>,
    /// Messaging webhook URL; carries auth in the URL itself.
    pub notify_webhook_url: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "signing_secret",
                &self.signing_secret.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "admin_api_key",
                &self.admin_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "notify_webhook_url",
                &self.notify_webhook_url.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Env var names extracted from the config JSON.
struct SecretEnvNames {
    signing_secret_var: String,
    admin_api_key_var: String,
    notify_webhook_var: String,
}

/// Read a non-empty string value at `pointer`.
pub(crate) fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_env_names(config_json: &Value) -> SecretEnvNames {
    SecretEnvNames {
        signing_secret_var: read_str_at(config_json, "/action_links/signing_secret_env")
            .unwrap_or_else(|| DEFAULT_SIGNING_SECRET_ENV.to_string()),
        admin_api_key_var: read_str_at(config_json, "/admin/api_key_env")
            .unwrap_or_else(|| DEFAULT_ADMIN_API_KEY_ENV.to_string()),
        notify_webhook_var: read_str_at(config_json, "/notify/webhook_env")
            .unwrap_or_else(|| DEFAULT_NOTIFY_WEBHOOK_ENV.to_string()),
    }
}

fn process_env(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok()
}

/// Resolve secrets from the process environment.
pub fn resolve_secrets(config_json: &Value, mode: LinkMode) -> Result<ResolvedSecrets> {
    resolve_secrets_with(config_json, mode, process_env)
}

/// Resolve secrets through `lookup` instead of the process environment.
///
/// Blank values count as absent.
///
/// # Errors
/// `SECRETS_MISSING` naming the env var when token mode has no signing secret.
pub fn resolve_secrets_with<F>(
    config_json: &Value,
    mode: LinkMode,
    lookup: F,
) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let names = parse_env_names(config_json);
    let resolve = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let signing_secret = resolve(&names.signing_secret_var);
    if mode == LinkMode::Token && signing_secret.is_none() {
        bail!(
            "SECRETS_MISSING mode=token: required env var '{}' \
             (action link signing secret) is not set or empty",
            names.signing_secret_var,
        );
    }

    Ok(ResolvedSecrets {
        signing_secret,
        admin_api_key: resolve(&names.admin_api_key_var),
        notify_webhook_url: resolve(&names.notify_webhook_var),
    })
}
