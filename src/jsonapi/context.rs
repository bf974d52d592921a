use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, HeaderName, Uri, request::Parts},
};
use std::convert::Infallible;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Per-request values the formatter needs: the request id reported in `meta`
/// and the request URL used for `links.self`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub id: String,
    pub url: String,
}

impl RequestContext {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }

    /// Reuses a caller supplied `x-request-id`, otherwise mints a UUID. The
    /// URL is kept as the path and query, it is made absolute together with
    /// the other links.
    pub fn from_parts(headers: &HeaderMap, uri: &Uri) -> Self {
        let id = headers
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let url = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        Self { id, url }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<RequestContext>() {
            return Ok(ctx.clone());
        }
        Ok(RequestContext::from_parts(&parts.headers, &parts.uri))
    }
}
