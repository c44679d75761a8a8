//! Order action orchestration, independent of HTTP.
//!
//! Request handling runs in a fixed order, each step an early exit:
//! resolve the authorization proof, map the action to its target status,
//! load the order, check legality, commit the status, then best-effort
//! attach a cancellation reason. The handlers in `routes.rs` only decode
//! the request and render the result.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use shop_db::{persist_reason_best_effort, OrderStore, ReasonSlot, StoreError};
use shop_token::{ActionClaims, ActionTokenAuthority};
use shop_workflow::{
    check_transition, next_status_for_action, Action, FulfillmentType, OrderStatus,
    TransitionError,
};

/// Longest cancellation reason kept, in characters.
pub const MAX_REASON_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("not authorized: {0}")]
    Authentication(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("order not found")]
    NotFound,
    #[error(transparent)]
    Conflict(#[from] TransitionError),
    /// The source is logged, never rendered.
    #[error("could not update the order, please try again")]
    Persistence(#[source] StoreError),
}

impl ActionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ActionError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ActionError::Validation(_) | ActionError::Conflict(_) => StatusCode::BAD_REQUEST,
            ActionError::NotFound => StatusCode::NOT_FOUND,
            ActionError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ---------------------------------------------------------------------------
// Authorization proof
// ---------------------------------------------------------------------------

/// The two ways a request can prove which action it may perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthProof {
    Token(ActionClaims),
    Plain { order_id: Uuid, action: Action },
}

/// Normalized `{order_id, action}` pair all downstream steps work on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRequest {
    pub order_id: Uuid,
    pub action: Action,
    /// "token" | "plain", for logs.
    pub via: &'static str,
}

fn present(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

/// Pick and check the authorization proof. A token wins when both a token
/// and plain identifiers are supplied.
pub fn resolve_proof(
    tokens: Option<&ActionTokenAuthority>,
    token: Option<&str>,
    order_id: Option<&str>,
    action: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AuthProof, ActionError> {
    if let Some(token) = present(token) {
        let authority = tokens.ok_or_else(|| {
            ActionError::Authentication("signed links are not enabled".to_string())
        })?;
        let claims = authority
            .verify_at(token, now)
            .map_err(|e| ActionError::Authentication(e.to_string()))?;
        return Ok(AuthProof::Token(claims));
    }

    let (Some(order_id), Some(action)) = (present(order_id), present(action)) else {
        return Err(ActionError::Authentication(
            "a token or both orderId and action are required".to_string(),
        ));
    };
    let order_id = Uuid::parse_str(order_id)
        .map_err(|_| ActionError::Validation(format!("orderId '{order_id}' is not a valid id")))?;
    let action = action
        .parse::<Action>()
        .map_err(|e| ActionError::Validation(e.to_string()))?;

    Ok(AuthProof::Plain { order_id, action })
}

impl AuthProof {
    pub fn into_request(self) -> Result<ActionRequest, ActionError> {
        match self {
            AuthProof::Plain { order_id, action } => Ok(ActionRequest {
                order_id,
                action,
                via: "plain",
            }),
            AuthProof::Token(claims) => {
                let action = claims
                    .action
                    .parse::<Action>()
                    .map_err(|e| ActionError::Validation(e.to_string()))?;
                Ok(ActionRequest {
                    order_id: claims.order_id,
                    action,
                    via: "token",
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Reason
// ---------------------------------------------------------------------------

/// Body reason first, then query reason. Blank values count as absent; the
/// kept value is trimmed and cut to [`MAX_REASON_CHARS`].
pub fn normalize_reason(body: Option<&str>, query: Option<&str>) -> Option<String> {
    present(body)
        .or_else(|| present(query))
        .map(|r| r.chars().take(MAX_REASON_CHARS).collect())
}

// ---------------------------------------------------------------------------
// Perform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub order_id: Uuid,
    pub code: String,
    pub previous: OrderStatus,
    pub status: OrderStatus,
    pub fulfillment: FulfillmentType,
    /// False when the order already had the target status.
    pub changed: bool,
    pub reason_slot: Option<ReasonSlot>,
}

pub async fn perform_action(
    store: &dyn OrderStore,
    req: ActionRequest,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<ActionOutcome, ActionError> {
    let target = next_status_for_action(req.action);

    let order = store
        .fetch_order(req.order_id)
        .await
        .map_err(|e| persistence(req.order_id, "fetch", e))?
        .ok_or(ActionError::NotFound)?;
    let fulfillment = order.fulfillment();

    if let Err(e) = check_transition(order.status, target, fulfillment) {
        warn!(
            order_id = %order.id,
            action = %req.action,
            via = req.via,
            from = %order.status,
            to = %target,
            "action refused"
        );
        return Err(e.into());
    }

    let mut outcome = ActionOutcome {
        order_id: order.id,
        code: order.code.clone(),
        previous: order.status,
        status: target,
        fulfillment,
        changed: false,
        reason_slot: None,
    };

    // Re-applying an action leaves the row untouched.
    if order.status == target {
        info!(order_id = %order.id, action = %req.action, via = req.via, "action already applied");
        return Ok(outcome);
    }

    let canceled_at = (target == OrderStatus::Canceled).then_some(now);
    let committed = store
        .commit_status(order.id, order.status, target, canceled_at)
        .await
        .map_err(|e| persistence(order.id, "commit", e))?;

    if !committed {
        // Someone else moved the order between our read and write.
        let current = store
            .fetch_order(order.id)
            .await
            .map_err(|e| persistence(order.id, "re-read", e))?
            .ok_or(ActionError::NotFound)?;
        if current.status == target {
            info!(order_id = %order.id, status = %target, "action applied concurrently");
            return Ok(outcome);
        }
        warn!(order_id = %order.id, from = %current.status, to = %target, "lost status race");
        return Err(TransitionError {
            from: current.status,
            to: target,
        }
        .into());
    }

    outcome.changed = true;
    info!(
        order_id = %order.id,
        code = %order.code,
        from = %order.status,
        to = %target,
        action = %req.action,
        via = req.via,
        "order status changed"
    );

    if target == OrderStatus::Canceled {
        if let Some(reason) = reason.as_deref() {
            outcome.reason_slot = persist_reason_best_effort(store, order.id, reason).await;
        }
    }

    Ok(outcome)
}

fn persistence(order_id: Uuid, step: &'static str, e: StoreError) -> ActionError {
    error!(order_id = %order_id, step, error = %e, "order persistence failed");
    ActionError::Persistence(e)
}
