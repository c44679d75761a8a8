//! Request and response types for all shop-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests.  No business logic lives here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shop_links::ActionLink;
use shop_workflow::{FulfillmentType, OrderStatus};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    /// "plain" | "token"
    pub link_mode: String,
}

// ---------------------------------------------------------------------------
// /api/orders/action
// ---------------------------------------------------------------------------

/// Query string of the action endpoint (GET and POST).
///
/// Every field is optional here; which combination is required is decided by
/// the handler so the error can be rendered in the caller's format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionQuery {
    pub token: Option<String>,
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    pub action: Option<String>,
    pub redirect: Option<String>,
    /// "html" (default) | "json"
    pub v: Option<String>,
    pub reason: Option<String>,
}

/// Optional JSON body of `POST /api/orders/action`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionBody {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSuccessResponse {
    pub success: bool,
    pub id: Uuid,
    pub code: String,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionErrorResponse {
    pub success: bool,
    pub error: String,
}

// ---------------------------------------------------------------------------
// Admin routes
// ---------------------------------------------------------------------------

/// Response body when an admin route is refused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateRefusedResponse {
    pub error: String,
    /// Which gate failed: "admin_key_configured" | "admin_key"
    pub gate: String,
}

/// Optional query of the admin link routes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinksQuery {
    pub redirect: Option<String>,
    pub v: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLinksResponse {
    pub id: Uuid,
    pub code: String,
    pub status: OrderStatus,
    pub status_label: String,
    pub fulfillment_type: FulfillmentType,
    pub links: Vec<ActionLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyAcceptedResponse {
    /// The message was handed to a background task; delivery is not confirmed.
    pub queued: bool,
    pub id: Uuid,
    pub links: Vec<ActionLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminErrorResponse {
    pub error: String,
}
