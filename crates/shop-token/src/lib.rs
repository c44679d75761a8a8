//! shop-token
//!
//! Signed, time-limited, single-purpose action tokens.
//!
//! # Wire format
//!
//! ```text
//! base64url(claims_json) "." base64url(HMAC-SHA256(secret, base64url(claims_json)))
//! ```
//!
//! Claims: `sub` (order id), `act` (action name), `pur` (purpose tag),
//! `iat` / `exp` (unix seconds). Both segments are unpadded base64url so the
//! token drops into a query string without escaping.
//!
//! # Verification is all-or-nothing
//!
//! [`ActionTokenAuthority::verify`] checks, in order: MAC, purpose tag,
//! expiry, subject and action shape. The first failure is returned; there is
//! no partially trusted result. Nothing is persisted or consulted besides the
//! secret and the clock.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use shop_config::ShopConfig;
use shop_workflow::Action;

type HmacSha256 = Hmac<Sha256>;

/// Purpose tag carried by every action token. Tokens signed with the same
/// secret for any other purpose are rejected.
pub const ACTION_PURPOSE: &str = "order_action";

// ---------------------------------------------------------------------------
// TokenError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// No signing secret configured. A configuration problem, not a caller one.
    #[error("action token signing secret is not configured")]
    MissingSecret,
    #[error("token ttl must be positive and representable (got {0}s)")]
    InvalidTtl(i64),
    #[error("token could not be encoded: {0}")]
    Encode(String),
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token was not issued for order actions")]
    WrongPurpose,
    #[error("token expired")]
    Expired,
    #[error("token is missing claim '{0}'")]
    MissingClaim(&'static str),
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// Claims exactly as serialized. Every field is optional on the way in so
/// that a missing claim surfaces as [`TokenError::MissingClaim`] instead of a
/// generic decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    act: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pur: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// A verified token's payload.
///
/// `action` is left as the raw name: mapping it to a status (and rejecting
/// unknown names) is the caller's validation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionClaims {
    pub order_id: Uuid,
    pub action: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ActionTokenAuthority
// ---------------------------------------------------------------------------

/// Issues and verifies action tokens with one symmetric secret.
/// **The key is redacted in `Debug` output.**
#[derive(Clone)]
pub struct ActionTokenAuthority {
    key: Vec<u8>,
    default_ttl_secs: i64,
}

impl std::fmt::Debug for ActionTokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionTokenAuthority")
            .field("key", &"<REDACTED>")
            .field("default_ttl_secs", &self.default_ttl_secs)
            .finish()
    }
}

impl ActionTokenAuthority {
    pub fn new(secret: &str, default_ttl_secs: i64) -> Result<Self, TokenError> {
        if secret.trim().is_empty() {
            return Err(TokenError::MissingSecret);
        }
        if default_ttl_secs <= 0 {
            return Err(TokenError::InvalidTtl(default_ttl_secs));
        }
        Ok(Self {
            key: secret.as_bytes().to_vec(),
            default_ttl_secs,
        })
    }

    /// Uses the configured secret and ttl. Fails with
    /// [`TokenError::MissingSecret`] when no secret is configured, whatever
    /// the link mode.
    pub fn from_config(cfg: &ShopConfig) -> Result<Self, TokenError> {
        let secret = cfg
            .signing_secret
            .as_deref()
            .ok_or(TokenError::MissingSecret)?;
        Self::new(secret, cfg.token_ttl_secs)
    }

    pub fn default_ttl_secs(&self) -> i64 {
        self.default_ttl_secs
    }

    /// Issue a token valid for the default ttl from now.
    pub fn issue(&self, order_id: Uuid, action: Action) -> Result<String, TokenError> {
        self.issue_at(order_id, action, self.default_ttl_secs, Utc::now())
    }

    pub fn issue_with_ttl(
        &self,
        order_id: Uuid,
        action: Action,
        ttl_secs: i64,
    ) -> Result<String, TokenError> {
        self.issue_at(order_id, action, ttl_secs, Utc::now())
    }

    /// Issue a token as if the clock read `now`.
    pub fn issue_at(
        &self,
        order_id: Uuid,
        action: Action,
        ttl_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if ttl_secs <= 0 {
            return Err(TokenError::InvalidTtl(ttl_secs));
        }
        let iat = now.timestamp();
        let exp = iat
            .checked_add(ttl_secs)
            .ok_or(TokenError::InvalidTtl(ttl_secs))?;
        self.sign(&WireClaims {
            sub: Some(order_id.to_string()),
            act: Some(action.as_str().to_string()),
            pur: Some(ACTION_PURPOSE.to_string()),
            iat: Some(iat),
            exp: Some(exp),
        })
    }

    pub fn verify(&self, token: &str) -> Result<ActionClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify as if the clock read `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<ActionClaims, TokenError> {
        let (payload_b64, sig_b64) = token.trim().split_once('.').ok_or(TokenError::Malformed)?;
        if payload_b64.is_empty() || sig_b64.is_empty() || sig_b64.contains('.') {
            return Err(TokenError::Malformed);
        }

        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| TokenError::Malformed)?;
        self.mac()?
            .chain_update(payload_b64.as_bytes())
            .verify_slice(&sig)
            .map_err(|_| TokenError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let claims: WireClaims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.pur.as_deref() != Some(ACTION_PURPOSE) {
            return Err(TokenError::WrongPurpose);
        }

        let exp = claims.exp.ok_or(TokenError::MissingClaim("exp"))?;
        if now.timestamp() >= exp {
            return Err(TokenError::Expired);
        }

        let sub = claims
            .sub
            .filter(|s| !s.trim().is_empty())
            .ok_or(TokenError::MissingClaim("sub"))?;
        let order_id = Uuid::parse_str(&sub).map_err(|_| TokenError::Malformed)?;

        let action = claims
            .act
            .filter(|a| !a.is_empty())
            .ok_or(TokenError::MissingClaim("act"))?;
        if !action.bytes().all(|b| b.is_ascii_lowercase() || b == b'_') {
            return Err(TokenError::Malformed);
        }

        let iat = claims.iat.unwrap_or(exp - self.default_ttl_secs);
        Ok(ActionClaims {
            order_id,
            action,
            issued_at: unix_to_utc(iat)?,
            expires_at: unix_to_utc(exp)?,
        })
    }

    fn sign(&self, claims: &WireClaims) -> Result<String, TokenError> {
        let json = serde_json::to_vec(claims).map_err(|e| TokenError::Encode(e.to_string()))?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(json);
        let sig = self
            .mac()?
            .chain_update(payload_b64.as_bytes())
            .finalize()
            .into_bytes();
        Ok(format!("{payload_b64}.{}", URL_SAFE_NO_PAD.encode(sig)))
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        // HMAC accepts keys of any length; the error arm is unreachable in practice.
        <HmacSha256 as Mac>::new_from_slice(&self.key).map_err(|_| TokenError::MissingSecret)
    }
}

fn unix_to_utc(secs: i64) -> Result<DateTime<Utc>, TokenError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or(TokenError::Malformed)
}

/// Remaining validity of a verified token at `now`; zero once expired.
pub fn remaining(claims: &ActionClaims, now: DateTime<Utc>) -> Duration {
    (claims.expires_at - now).max(Duration::zero())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
