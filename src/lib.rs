use axum::{Router, http::Method, middleware};
use std::error::Error;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
};

use crate::handler::AppState;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod jsonapi;
pub mod model;
pub mod places;
pub mod posts;

pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

/// The full service router. Every response passes through the JSON:API
/// envelope, so unknown routes, rejected requests and handler panics come back
/// as error documents too.
pub fn app(state: AppState) -> Router {
    let routes = Router::new()
        .nest("/places", places::routes())
        .nest("/posts", posts::routes())
        .fallback(handler::not_found);

    with_envelope(routes, state)
}

fn with_envelope(routes: Router<AppState>, state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    // Panics become plain 500s inside the envelope, which rewrites them.
    routes
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn_with_state(
            state.jsonapi.clone(),
            jsonapi::middleware::envelope,
        ))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::jsonapi::{Formatter, JsonApiConfig, MEDIA_TYPE};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value as JsonValue, json};
    use tower::ServiceExt;
    use url::Url;

    async fn test_app() -> Router {
        let db = Database::open(":memory:").await.unwrap();
        let config = JsonApiConfig::new(Url::parse("http://localhost:8080").unwrap());
        app(AppState::new(db, Formatter::new(config)))
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn with_json(method: &str, uri: &str, body: JsonValue) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> JsonValue {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn content_type(response: &Response) -> &str {
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    async fn create(app: &Router, name: &str) -> JsonValue {
        let req = with_json(
            "POST",
            "/places",
            json!({ "data": { "type": "places", "attributes": { "name": name, "location": "56.96,24.17" } } }),
        );
        let response = send(app, req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    #[tokio::test]
    async fn test_list_places_empty() {
        let app = test_app().await;
        let response = send(&app, get("/places")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), MEDIA_TYPE);
        let request_id = response.headers().get("x-request-id").unwrap().to_str().unwrap().to_string();

        let body = body_json(response).await;
        assert_eq!(body["data"], json!([]));
        assert_eq!(body["meta"]["id"], request_id.as_str());
        assert!(body.get("links").is_none());
    }

    #[tokio::test]
    async fn test_create_and_get_place() {
        let app = test_app().await;
        let created = create(&app, "Best Burgers").await;

        assert_eq!(created["data"]["type"], "places");
        assert_eq!(created["data"]["attributes"]["name"], "Best Burgers");
        assert!(created["data"]["attributes"].get("created-at").is_some());
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let response = send(&app, get(&format!("/places/{}", id))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["id"], id.as_str());
        assert_eq!(body["links"]["self"], format!("http://localhost:8080/places/{}", id));
    }

    #[tokio::test]
    async fn test_list_places_paginated() {
        let app = test_app().await;
        for i in 0..3 {
            create(&app, &format!("Place {}", i)).await;
        }

        let response = send(&app, get("/places?page=2&size=2")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;

        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["attributes"]["name"], "Place 0");
        assert_eq!(body["meta"]["total-count"], 3);
        assert_eq!(body["meta"]["current-page"], 2);
        assert_eq!(body["meta"]["total-pages"], 2);
        assert_eq!(body["links"]["self"], "http://localhost:8080/places?page=2&size=2");
    }

    #[tokio::test]
    async fn test_bad_page_size() {
        let app = test_app().await;
        let response = send(&app, get("/places?size=500")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(content_type(&response), MEDIA_TYPE);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["status"], "400");
        assert_eq!(body["errors"][0]["detail"], "\"size\" must be less than or equal to 100");
    }

    #[tokio::test]
    async fn test_get_missing_place() {
        let app = test_app().await;
        let response = send(&app, get("/places/42")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(content_type(&response), MEDIA_TYPE);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["title"], "Not Found");
        assert!(body["meta"]["id"].is_string());
        assert!(body.get("data").is_none());
    }

    async fn create_error(app: &Router, attributes: JsonValue) -> (StatusCode, JsonValue) {
        let req = with_json("POST", "/places", json!({ "data": { "type": "places", "attributes": attributes } }));
        let response = send(app, req).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    #[tokio::test]
    async fn test_create_place_checks_attributes() {
        let app = test_app().await;

        let (status, body) = create_error(&app, json!({ "name": "", "location": "x" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["detail"], "\"name\" is not allowed to be empty");

        let (status, body) = create_error(&app, json!({ "location": "x" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["detail"], "\"name\" is required");

        let (status, body) = create_error(&app, json!({ "name": "A", "location": 5 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["detail"], "\"location\" must be a string");

        let (status, body) = create_error(&app, json!({ "name": "A", "location": "x", "picture": "p.png" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["detail"], "\"picture\" is not allowed");
    }

    #[tokio::test]
    async fn test_create_place_accepts_blank_name() {
        let app = test_app().await;
        let created = create(&app, " ").await;
        assert_eq!(created["data"]["attributes"]["name"], " ");
    }

    #[tokio::test]
    async fn test_create_place_without_json_content_type() {
        let app = test_app().await;
        let body = json!({ "data": { "type": "places", "attributes": { "name": "A", "location": "x" } } });
        let req = Request::builder()
            .method("POST")
            .uri("/places")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = send(&app, req).await;

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(content_type(&response), MEDIA_TYPE);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["status"], "415");
        assert_eq!(body["errors"][0]["title"], "Unsupported Media Type");
    }

    async fn boom() -> StatusCode {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_error_document() {
        let db = Database::open(":memory:").await.unwrap();
        let config = JsonApiConfig::new(Url::parse("http://localhost:8080").unwrap());
        let state = AppState::new(db, Formatter::new(config));
        let app = with_envelope(Router::new().route("/boom", axum::routing::get(boom)), state);

        let response = send(&app, get("/boom")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type(&response), MEDIA_TYPE);
        assert!(response.headers().contains_key("x-request-id"));

        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["status"], "500");
        assert_eq!(body["errors"][0]["detail"], crate::error::INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_update_place() {
        let app = test_app().await;
        let created = create(&app, "Old").await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let req = with_json(
            "PATCH",
            &format!("/places/{}", id),
            json!({ "data": { "type": "places", "id": id, "attributes": { "name": "New" } } }),
        );
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["attributes"]["name"], "New");
        assert_eq!(body["data"]["attributes"]["location"], "56.96,24.17");
    }

    #[tokio::test]
    async fn test_update_place_id_mismatch() {
        let app = test_app().await;
        let created = create(&app, "Old").await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let req = with_json(
            "PATCH",
            &format!("/places/{}", id),
            json!({ "data": { "type": "places", "id": "999", "attributes": { "name": "New" } } }),
        );
        let response = send(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["detail"], "IDs passed in both path and body must match");
    }

    #[tokio::test]
    async fn test_delete_place() {
        let app = test_app().await;
        let created = create(&app, "Gone").await;
        let uri = format!("/places/{}", created["data"]["id"].as_str().unwrap());

        let delete = |uri: &str| Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap();
        assert_eq!(send(&app, delete(&uri)).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(send(&app, delete(&uri)).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(send(&app, get(&uri)).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = test_app().await;
        let response = send(&app, get("/nowhere")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["status"], "404");
        assert_eq!(body["errors"][0]["detail"], "Not Found");
    }

    #[tokio::test]
    async fn test_request_id_is_reused() {
        let app = test_app().await;
        let req = Request::builder()
            .uri("/places")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, req).await;

        assert_eq!(response.headers()["x-request-id"], "abc-123");
        let body = body_json(response).await;
        assert_eq!(body["meta"]["id"], "abc-123");
    }

    #[tokio::test]
    async fn test_posts_are_grouped() {
        let db = Database::open(":memory:").await.unwrap();
        db.connection()
            .execute(
                "INSERT INTO reviews (item, body, created_at) VALUES ('3', 'juicy', '2017-05-01T12:00:00.000Z')",
                (),
            )
            .await
            .unwrap();
        let config = JsonApiConfig::new(Url::parse("http://localhost:8080").unwrap());
        let app = app(AppState::new(db, Formatter::new(config)));

        let response = send(&app, get("/posts")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["2017-05-01"]["3"][0]["body"], "juicy");
    }
}
