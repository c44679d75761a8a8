//! Axum router and all HTTP handlers for shop-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Tests compose the bare router directly.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use shop_db::OrderRecord;
use shop_links::{ActionLink, LinkOptions, ResponseFormat, ACTION_PATH};

use crate::{
    action::{normalize_reason, perform_action, resolve_proof, ActionError, ActionOutcome},
    api_types::{
        ActionBody, ActionQuery, AdminErrorResponse, GateRefusedResponse, HealthResponse,
        LinksQuery, NotifyAcceptedResponse, OrderLinksResponse,
    },
    notify::{compose_message, spawn_notify, NotifyPayload},
    respond::{action_failure, action_success, safe_redirect},
    state::AppState,
};

/// Header carrying the back-office key on admin routes.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route(ACTION_PATH, get(action_get).post(action_post))
        .route("/api/admin/orders/:id/links", get(admin_links))
        .route("/api/admin/orders/:id/notify", post(admin_notify))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            link_mode: st.config.link_mode.as_str().to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET|POST /api/orders/action
// ---------------------------------------------------------------------------

pub(crate) async fn action_get(
    State(st): State<Arc<AppState>>,
    uri: Uri,
    query: Result<Query<ActionQuery>, QueryRejection>,
) -> Response {
    let Query(q) = match query {
        Ok(q) => q,
        Err(rej) => return malformed_query(uri.query(), rej),
    };
    run_action(&st, q, None).await
}

/// Same as GET, plus an optional JSON body `{ "reason": ".." }` that takes
/// precedence over the `reason` query parameter. The body is only read once
/// the request is authorized.
pub(crate) async fn action_post(
    State(st): State<Arc<AppState>>,
    uri: Uri,
    query: Result<Query<ActionQuery>, QueryRejection>,
    body: Bytes,
) -> Response {
    let Query(q) = match query {
        Ok(q) => q,
        Err(rej) => return malformed_query(uri.query(), rej),
    };
    run_action(&st, q, Some(&body[..])).await
}

/// The typed query failed, so the format hint is read leniently from the
/// raw query string.
fn malformed_query(raw: Option<&str>, rej: QueryRejection) -> Response {
    let hint = raw.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
    });
    let err = ActionError::Validation(format!("malformed query string: {rej}"));
    action_failure(ResponseFormat::from_hint(hint.as_deref()), &err)
}

async fn run_action(st: &AppState, q: ActionQuery, body: Option<&[u8]>) -> Response {
    let format = ResponseFormat::from_hint(q.v.as_deref());
    let result = authorize_and_perform(st, &q, body).await;

    match result {
        Ok(outcome) => {
            let redirect = safe_redirect(&st.config.base_url, q.redirect.as_deref());
            if redirect.is_none() && q.redirect.as_deref().is_some_and(|r| !r.trim().is_empty()) {
                warn!(order_id = %outcome.order_id, "redirect target refused");
            }
            action_success(format, redirect, &outcome)
        }
        Err(err) => {
            if let ActionError::Authentication(_) = err {
                warn!(error = %err, "order action not authorized");
            }
            action_failure(format, &err)
        }
    }
}

async fn authorize_and_perform(
    st: &AppState,
    q: &ActionQuery,
    body: Option<&[u8]>,
) -> Result<ActionOutcome, ActionError> {
    let now = Utc::now();
    let proof = resolve_proof(
        st.tokens.as_ref(),
        q.token.as_deref(),
        q.order_id.as_deref(),
        q.action.as_deref(),
        now,
    )?;
    let req = proof.into_request()?;
    let body_reason = match body {
        Some(body) => parse_body_reason(body)?,
        None => None,
    };
    let reason = normalize_reason(body_reason.as_deref(), q.reason.as_deref());
    perform_action(st.store.as_ref(), req, reason, now).await
}

/// An empty or whitespace body is no body.
fn parse_body_reason(body: &[u8]) -> Result<Option<String>, ActionError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<ActionBody>(body)
        .map(|b| b.reason)
        .map_err(|_| ActionError::Validation("request body must be a JSON object".to_string()))
}

// ---------------------------------------------------------------------------
// Admin routes
// ---------------------------------------------------------------------------

/// Fails closed: without a configured key every admin request is refused.
fn check_admin_key(st: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = st.config.admin_api_key.as_deref() else {
        return Err(gate_refused(
            "GATE_REFUSED: admin api key is not configured",
            "admin_key_configured",
        ));
    };

    let supplied = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    // Compare fixed-length digests rather than the raw keys.
    if Sha256::digest(supplied.as_bytes()) != Sha256::digest(expected.as_bytes()) {
        return Err(gate_refused(
            "GATE_REFUSED: missing or wrong admin key",
            "admin_key",
        ));
    }
    Ok(())
}

fn gate_refused(error: &str, gate: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(GateRefusedResponse {
            error: error.to_string(),
            gate: gate.to_string(),
        }),
    )
        .into_response()
}

fn admin_error(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(AdminErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

async fn order_with_links(
    st: &AppState,
    raw_id: &str,
    opts: &LinkOptions,
) -> Result<(OrderRecord, Vec<ActionLink>), Response> {
    let id = Uuid::parse_str(raw_id)
        .map_err(|_| admin_error(StatusCode::BAD_REQUEST, "order id is not a valid id"))?;

    let order = match st.store.fetch_order(id).await {
        Ok(Some(o)) => o,
        Ok(None) => return Err(admin_error(StatusCode::NOT_FOUND, "order not found")),
        Err(e) => {
            warn!(order_id = %id, error = %e, "admin order lookup failed");
            return Err(admin_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "could not load the order",
            ));
        }
    };

    let links = st
        .links
        .links_for_order(order.id, order.status, order.fulfillment(), opts)
        .map_err(|e| {
            warn!(order_id = %id, error = %e, "action link construction failed");
            admin_error(StatusCode::INTERNAL_SERVER_ERROR, "could not build action links")
        })?;

    Ok((order, links))
}

// ---------------------------------------------------------------------------
// GET /api/admin/orders/:id/links
// ---------------------------------------------------------------------------

pub(crate) async fn admin_links(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(q): Query<LinksQuery>,
) -> Response {
    if let Err(refused) = check_admin_key(&st, &headers) {
        return refused;
    }

    let opts = LinkOptions {
        redirect: q.redirect,
        response_format: q.v.as_deref().map(|v| ResponseFormat::from_hint(Some(v))),
    };
    let (order, links) = match order_with_links(&st, &id, &opts).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let fulfillment = order.fulfillment();
    (
        StatusCode::OK,
        Json(OrderLinksResponse {
            id: order.id,
            code: order.code,
            status: order.status,
            status_label: order.status.label(fulfillment).to_string(),
            fulfillment_type: fulfillment,
            links,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /api/admin/orders/:id/notify
// ---------------------------------------------------------------------------

/// Queue a staff notification carrying the order's action links.
///
/// Answers `202` once the post is handed to a background task; the webhook's
/// outcome is only logged.
pub(crate) async fn admin_notify(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(refused) = check_admin_key(&st, &headers) {
        return refused;
    }

    let Some(webhook_url) = st.config.notify.webhook_url.clone() else {
        return admin_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "messaging webhook is not configured",
        );
    };

    let (order, links) = match order_with_links(&st, &id, &LinkOptions::default()).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let label = order.status.label(order.fulfillment());
    let payload = NotifyPayload {
        order_id: order.id,
        code: order.code.clone(),
        text: compose_message(&order.code, label, &links),
        links: links.clone(),
    };
    spawn_notify(
        st.http.clone(),
        webhook_url,
        st.config.notify.timeout,
        payload,
    );
    info!(order_id = %order.id, links = links.len(), "order notification queued");

    (
        StatusCode::ACCEPTED,
        Json(NotifyAcceptedResponse {
            queued: true,
            id: order.id,
            links,
        }),
    )
        .into_response()
}
