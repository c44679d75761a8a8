//! Shared runtime state for shop-daemon.
//!
//! Everything here is immutable after startup; handlers receive
//! `State<Arc<AppState>>` from Axum. Per-order concurrency is left to the
//! store's conditional update.

use std::sync::Arc;

use shop_config::ShopConfig;
use shop_db::OrderStore;
use shop_links::{ActionLinkBuilder, LinkError};
use shop_token::ActionTokenAuthority;

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub config: Arc<ShopConfig>,
    pub store: Arc<dyn OrderStore>,
    pub links: ActionLinkBuilder,
    /// Present whenever a signing secret is configured, in either link mode,
    /// so tokens already in circulation keep working while a deployment
    /// moves between modes.
    pub tokens: Option<ActionTokenAuthority>,
    /// Outbound client for the messaging webhook.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: ShopConfig, store: Arc<dyn OrderStore>) -> Result<Self, LinkError> {
        let links = ActionLinkBuilder::from_config(&config)?;
        let tokens = match config.signing_secret {
            Some(_) => Some(ActionTokenAuthority::from_config(&config)?),
            None => None,
        };

        Ok(Self {
            build: BuildInfo {
                service: "shop-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            config: Arc::new(config),
            store,
            links,
            tokens,
            http: reqwest::Client::new(),
        })
    }
}
