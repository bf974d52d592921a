use axum::{Json, extract::State};
use serde_json::Value as JsonValue;

use super::{Posts, group_posts};
use crate::error::Fault;
use crate::handler::AppState;
use crate::jsonapi::RequestContext;

/// The feed is plain JSON rather than a JSON:API document.
pub async fn get_posts(State(state): State<AppState>, ctx: RequestContext) -> Result<Json<JsonValue>, Fault> {
    let lib = Posts::new(state.db.connection());
    let reviews = lib.list_reviews().await.map_err(Fault::internal)?;

    tracing::info!(request_id = %ctx.id, count = reviews.len(), "listed posts");
    let posts = group_posts(&reviews).map_err(Fault::internal)?;
    Ok(Json(JsonValue::Object(posts)))
}
