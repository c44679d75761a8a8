//! shop-links
//!
//! Builds externally dispatchable action links (admin pages, messaging
//! integrations). A link points at the order action endpoint and carries
//! one authorization proof:
//!
//! - **plain mode**: `orderId` + `action` query parameters;
//! - **token mode**: a single signed `token` parameter minted by
//!   [`shop_token::ActionTokenAuthority`].
//!
//! Optional `redirect` and `v` (response format) parameters are appended in
//! both modes.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use shop_config::{LinkMode, ShopConfig};
use shop_token::{ActionTokenAuthority, TokenError};
use shop_workflow::{allowed_actions_for_display, Action, FulfillmentType, OrderStatus};

/// Path of the order action endpoint, relative to the configured base URL.
pub const ACTION_PATH: &str = "/api/orders/action";

// ---------------------------------------------------------------------------
// ResponseFormat
// ---------------------------------------------------------------------------

/// What the action endpoint should answer with (`v` query parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Html,
    Json,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Html => "html",
            ResponseFormat::Json => "json",
        }
    }

    /// Lenient parse of the `v` hint: anything other than `json` is HTML.
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint.map(|h| h.trim().to_ascii_lowercase()) {
            Some(h) if h == "json" => ResponseFormat::Json,
            _ => ResponseFormat::Html,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors / options / outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("base url '{0}' cannot carry a path")]
    InvalidBase(String),
}

#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    /// Where the endpoint should send the browser afterwards.
    pub redirect: Option<String>,
    pub response_format: Option<ResponseFormat>,
}

/// One ready-to-dispatch link plus the caption staff should see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLink {
    pub action: Action,
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptDenyLinks {
    pub accept: String,
    pub deny: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressLinks {
    pub dispatch_or_ready: String,
    pub complete: String,
}

// ---------------------------------------------------------------------------
// ActionLinkBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ActionLinkBuilder {
    action_url: Url,
    mode: LinkMode,
    authority: Option<ActionTokenAuthority>,
}

impl ActionLinkBuilder {
    /// Token mode requires a usable signing secret; plain mode never mints.
    pub fn from_config(cfg: &ShopConfig) -> Result<Self, LinkError> {
        let authority = match cfg.link_mode {
            LinkMode::Token => Some(ActionTokenAuthority::from_config(cfg)?),
            LinkMode::Plain => None,
        };
        Ok(Self {
            action_url: action_url(&cfg.base_url)?,
            mode: cfg.link_mode,
            authority,
        })
    }

    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    /// Absolute URL of the action endpoint, without query.
    pub fn action_url(&self) -> &Url {
        &self.action_url
    }

    pub fn build_action_link(
        &self,
        order_id: Uuid,
        action: Action,
        opts: &LinkOptions,
    ) -> Result<String, LinkError> {
        let token = match (&self.mode, &self.authority) {
            (LinkMode::Token, Some(authority)) => Some(authority.issue(order_id, action)?),
            (LinkMode::Token, None) => return Err(TokenError::MissingSecret.into()),
            (LinkMode::Plain, _) => None,
        };

        let mut url = self.action_url.clone();
        {
            let mut q = url.query_pairs_mut();
            match token {
                Some(tok) => {
                    q.append_pair("token", &tok);
                }
                None => {
                    q.append_pair("orderId", &order_id.to_string());
                    q.append_pair("action", action.as_str());
                }
            }
            if let Some(redirect) = opts.redirect.as_deref().filter(|r| !r.is_empty()) {
                q.append_pair("redirect", redirect);
            }
            if let Some(fmt) = opts.response_format {
                q.append_pair("v", fmt.as_str());
            }
        }
        Ok(url.into())
    }

    pub fn build_accept_deny_links(
        &self,
        order_id: Uuid,
        opts: &LinkOptions,
    ) -> Result<AcceptDenyLinks, LinkError> {
        Ok(AcceptDenyLinks {
            accept: self.build_action_link(order_id, Action::Accept, opts)?,
            deny: self.build_action_link(order_id, Action::Deny, opts)?,
        })
    }

    pub fn build_progress_links(
        &self,
        order_id: Uuid,
        opts: &LinkOptions,
    ) -> Result<ProgressLinks, LinkError> {
        Ok(ProgressLinks {
            dispatch_or_ready: self.build_action_link(order_id, Action::DispatchOrReady, opts)?,
            complete: self.build_action_link(order_id, Action::Complete, opts)?,
        })
    }

    /// Links for exactly the actions the display policy offers in `status`.
    pub fn links_for_order(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        fulfillment: FulfillmentType,
        opts: &LinkOptions,
    ) -> Result<Vec<ActionLink>, LinkError> {
        allowed_actions_for_display(status, fulfillment)
            .iter()
            .map(|action| {
                Ok(ActionLink {
                    action: *action,
                    label: action.label(fulfillment).to_string(),
                    url: self.build_action_link(order_id, *action, opts)?,
                })
            })
            .collect()
    }
}

fn action_url(base: &Url) -> Result<Url, LinkError> {
    if base.cannot_be_a_base() {
        return Err(LinkError::InvalidBase(base.to_string()));
    }
    let mut url = base.clone();
    let path = format!("{}{}", base.path().trim_end_matches('/'), ACTION_PATH);
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
