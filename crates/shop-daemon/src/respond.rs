//! Rendering of action results: redirect, JSON, or a minimal HTML page.
//!
//! Errors are always rendered in the format the caller asked for.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use url::Url;

use shop_links::ResponseFormat;

use crate::action::{ActionError, ActionOutcome};
use crate::api_types::{ActionErrorResponse, ActionSuccessResponse};

/// Honor `raw` only if it is a same-site path or an absolute URL with the
/// same origin as `base`, and only if it can be sent as a `Location`
/// header. Anything else is dropped.
pub fn safe_redirect(base: &Url, raw: Option<&str>) -> Option<String> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    if raw.chars().any(char::is_control) || HeaderValue::from_str(raw).is_err() {
        return None;
    }

    if raw.starts_with('/') {
        // "//host" and "/\host" are protocol-relative in browsers.
        if raw.starts_with("//") || raw.starts_with("/\\") {
            return None;
        }
        return Some(raw.to_string());
    }

    let target = Url::parse(raw).ok()?;
    let same_origin = target.scheme() == base.scheme()
        && target.host_str() == base.host_str()
        && target.port_or_known_default() == base.port_or_known_default();
    same_origin.then(|| target.to_string())
}

pub fn action_success(
    format: ResponseFormat,
    redirect: Option<String>,
    outcome: &ActionOutcome,
) -> Response {
    if let Some(location) = redirect.and_then(|to| HeaderValue::from_str(&to).ok()) {
        return (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response();
    }

    match format {
        ResponseFormat::Json => (
            StatusCode::OK,
            Json(ActionSuccessResponse {
                success: true,
                id: outcome.order_id,
                code: outcome.code.clone(),
                status: outcome.status,
            }),
        )
            .into_response(),
        ResponseFormat::Html => {
            let label = outcome.status.label(outcome.fulfillment);
            let body = format!(
                "<p>Order <strong>{}</strong> is now: {}.</p>",
                escape_html(&outcome.code),
                escape_html(label)
            );
            (StatusCode::OK, Html(page("Order updated", &body))).into_response()
        }
    }
}

pub fn action_failure(format: ResponseFormat, err: &ActionError) -> Response {
    let status = err.status_code();
    match format {
        ResponseFormat::Json => (
            status,
            Json(ActionErrorResponse {
                success: false,
                error: err.to_string(),
            }),
        )
            .into_response(),
        ResponseFormat::Html => {
            let body = format!(
                "<p>{}</p><p>Please go back and try again from the original link.</p>",
                escape_html(&err.to_string())
            );
            (status, Html(page("Action failed", &body))).into_response()
        }
    }
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><h1>{title}</h1>{body}</body></html>\n"
    )
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
