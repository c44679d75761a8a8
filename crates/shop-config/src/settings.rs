//! Typed configuration, built once at process start.
//!
//! `ShopConfig` is constructed from a [`LoadedConfig`] (plus the environment)
//! by the binaries, or directly with [`ShopConfig::new`] in tests. It is then
//! handed by reference to the token authority and link builder; nothing
//! downstream reads the process environment.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use url::Url;

use crate::secrets::{read_str_at, resolve_secrets, resolve_secrets_with, ResolvedSecrets};
use crate::LoadedConfig;

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 900;
/// Longest link lifetime accepted from config: one day.
pub const MAX_TOKEN_TTL_SECS: i64 = 86_400;
pub const DEFAULT_NOTIFY_TIMEOUT_MS: u64 = 3_000;

// ---------------------------------------------------------------------------
// LinkMode
// ---------------------------------------------------------------------------

/// How action links carry their authorization proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMode {
    /// `orderId` + `action` as plain query parameters.
    #[default]
    Plain,
    /// A single signed, time-limited `token` parameter.
    Token,
}

impl LinkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkMode::Plain => "plain",
            LinkMode::Token => "token",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(LinkMode::Plain),
            "token" => Ok(LinkMode::Token),
            other => Err(anyhow!(
                "CONFIG_INVALID action_links.mode='{other}'; expected one of: plain | token"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// NotifyConfig
// ---------------------------------------------------------------------------

/// Outbound messaging webhook settings. **URL is redacted in `Debug`.**
#[derive(Clone)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    pub timeout: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout: Duration::from_millis(DEFAULT_NOTIFY_TIMEOUT_MS),
        }
    }
}

impl std::fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyConfig")
            .field(
                "webhook_url",
                &self.webhook_url.as_ref().map(|_| "<REDACTED>"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ShopConfig
// ---------------------------------------------------------------------------

/// Everything that changes observable behavior of the action workflow.
/// **Secrets are redacted in `Debug`.**
#[derive(Clone)]
pub struct ShopConfig {
    /// Absolute http(s) URL. Used to build links and to validate redirects.
    pub base_url: Url,
    pub link_mode: LinkMode,
    /// Lifetime of freshly issued action tokens.
    pub token_ttl_secs: i64,
    /// Mandatory in token mode, unused in plain mode.
    pub signing_secret: Option<String>,
    pub admin_api_key: Option<String>,
    pub notify: NotifyConfig,
    /// Hash of the layered YAML this config came from, if any.
    pub config_hash: Option<String>,
}

impl std::fmt::Debug for ShopConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopConfig")
            .field("base_url", &self.base_url.as_str())
            .field("link_mode", &self.link_mode)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field(
                "signing_secret",
                &self.signing_secret.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "admin_api_key",
                &self.admin_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .field("notify", &self.notify)
            .field("config_hash", &self.config_hash)
            .finish()
    }
}

impl ShopConfig {
    /// Plain-mode config with defaults; the usual starting point for tests.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            link_mode: LinkMode::Plain,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            signing_secret: None,
            admin_api_key: None,
            notify: NotifyConfig::default(),
            config_hash: None,
        })
    }

    /// Switch to token mode with the given signing secret.
    pub fn with_token_mode(mut self, signing_secret: impl Into<String>) -> Self {
        self.link_mode = LinkMode::Token;
        self.signing_secret = Some(signing_secret.into());
        self
    }

    pub fn with_admin_api_key(mut self, key: impl Into<String>) -> Self {
        self.admin_api_key = Some(key.into());
        self
    }

    /// Build from layered YAML, resolving secrets from the process environment.
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let mode = read_link_mode(&loaded.config_json)?;
        let secrets = resolve_secrets(&loaded.config_json, mode)?;
        Self::assemble(loaded, mode, secrets)
    }

    /// Build from layered YAML, resolving secrets through `lookup`.
    pub fn from_loaded_with_env<F>(loaded: &LoadedConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = read_link_mode(&loaded.config_json)?;
        let secrets = resolve_secrets_with(&loaded.config_json, mode, lookup)?;
        Self::assemble(loaded, mode, secrets)
    }

    fn assemble(loaded: &LoadedConfig, mode: LinkMode, secrets: ResolvedSecrets) -> Result<Self> {
        let cfg = &loaded.config_json;

        let base_url = read_str_at(cfg, "/app/base_url")
            .ok_or_else(|| anyhow!("CONFIG_MISSING app.base_url"))?;

        let token_ttl_secs = match cfg.pointer("/action_links/token_ttl_secs") {
            None | Some(Value::Null) => DEFAULT_TOKEN_TTL_SECS,
            Some(v) => v
                .as_i64()
                .ok_or_else(|| anyhow!("CONFIG_INVALID action_links.token_ttl_secs must be an integer"))?,
        };
        if token_ttl_secs <= 0 {
            bail!("CONFIG_INVALID action_links.token_ttl_secs must be > 0 (got {token_ttl_secs})");
        }
        if token_ttl_secs > MAX_TOKEN_TTL_SECS {
            bail!(
                "CONFIG_INVALID action_links.token_ttl_secs must be <= {MAX_TOKEN_TTL_SECS} (got {token_ttl_secs})"
            );
        }

        let timeout_ms = match cfg.pointer("/notify/timeout_ms") {
            None | Some(Value::Null) => DEFAULT_NOTIFY_TIMEOUT_MS,
            Some(v) => v
                .as_u64()
                .ok_or_else(|| anyhow!("CONFIG_INVALID notify.timeout_ms must be a positive integer"))?,
        };

        Ok(Self {
            base_url: parse_base_url(&base_url)?,
            link_mode: mode,
            token_ttl_secs,
            signing_secret: secrets.signing_secret,
            admin_api_key: secrets.admin_api_key,
            notify: NotifyConfig {
                webhook_url: secrets.notify_webhook_url,
                timeout: Duration::from_millis(timeout_ms),
            },
            config_hash: Some(loaded.config_hash.clone()),
        })
    }
}

fn read_link_mode(cfg: &Value) -> Result<LinkMode> {
    match read_str_at(cfg, "/action_links/mode") {
        Some(raw) => LinkMode::parse(&raw),
        None => Ok(LinkMode::default()),
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .with_context(|| format!("CONFIG_INVALID app.base_url '{raw}' is not an absolute URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("CONFIG_INVALID app.base_url must use http or https (got '{}')", url.scheme());
    }
    if url.host_str().is_none() {
        bail!("CONFIG_INVALID app.base_url must include a host");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_mode_parse_is_case_insensitive() {
        assert_eq!(LinkMode::parse("TOKEN").unwrap(), LinkMode::Token);
        assert_eq!(LinkMode::parse(" plain ").unwrap(), LinkMode::Plain);
        assert!(LinkMode::parse("jwt").is_err());
    }

    #[test]
    fn base_url_must_be_absolute_http() {
        assert!(ShopConfig::new("https://shop.example").is_ok());
        assert!(ShopConfig::new("/relative").is_err());
        assert!(ShopConfig::new("ftp://shop.example").is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = ShopConfig::new("https://shop.example")
            .unwrap()
            .with_token_mode("super-secret-value")
            .with_admin_api_key("admin-key-value");
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("super-secret-value"), "{dbg}");
        assert!(!dbg.contains("admin-key-value"), "{dbg}");
        assert!(dbg.contains("<REDACTED>"));
    }
}
