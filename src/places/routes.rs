use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::list_places))
        .route("/", post(handler::create_place))
        .route("/:id", get(handler::get_place))
        .route("/:id", patch(handler::update_place))
        .route("/:id", delete(handler::delete_place))
}
