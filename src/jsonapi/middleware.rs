use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::context::{REQUEST_ID_HEADER, RequestContext};
use super::document::MEDIA_TYPE;
use super::formatter::Formatter;
use crate::error::{Fault, INTERNAL_ERROR_MESSAGE};

// Framework rejection bodies are short plain-text messages.
const MAX_ERROR_BODY: usize = 64 * 1024;

/// Runs around every route. Assigns the request context, then rewrites any
/// terminal error response into a JSON:API error document.
pub async fn envelope(
    State(formatter): State<Arc<Formatter>>,
    mut req: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::from_parts(req.headers(), req.uri());
    req.extensions_mut().insert(ctx.clone());
    tracing::info!(request_id = %ctx.id, method = %req.method(), url = %ctx.url, "request received");

    let response = next.run(req).await;
    let mut response = rewrite_fault(&formatter, &ctx.id, response).await;

    if let Ok(value) = HeaderValue::from_str(&ctx.id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    tracing::info!(request_id = %ctx.id, status = response.status().as_u16(), "response sent");
    response
}

pub async fn rewrite_fault(formatter: &Formatter, request_id: &str, response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_jsonapi(response.headers()) {
        return response;
    }

    let fault = response.extensions().get::<Fault>().cloned();
    let (mut parts, body) = response.into_parts();
    let detail = match fault {
        Some(fault) => fault.message,
        None => detail_from_body(status, body).await,
    };

    let document = formatter.error_document(request_id, status, &detail);
    let bytes = match serde_json::to_vec(&document) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(request_id, error = %e, "failed to encode error document");
            Vec::new()
        }
    };

    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}

fn is_jsonapi(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with(MEDIA_TYPE))
        .unwrap_or(false)
}

/// Errors that did not come from a [`Fault`] are framework rejections. Their
/// plain-text body is the best available detail for client errors. Server
/// errors never leak their body.
async fn detail_from_body(status: StatusCode, body: Body) -> String {
    let reason = status.canonical_reason().unwrap_or("Unknown Error");
    if status.is_server_error() {
        return INTERNAL_ERROR_MESSAGE.to_string();
    }

    match to_bytes(body, MAX_ERROR_BODY).await {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            if text.is_empty() { reason.to_string() } else { text }
        }
        Err(_) => reason.to_string(),
    }
}
