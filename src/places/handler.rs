//! HTTP handlers for `/places`

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use super::{CreatePlace, Places, UpdatePlace};
use crate::api::{NewResource, RequestDocument, ResourceChanges};
use crate::error::Fault;
use crate::handler::AppState;
use crate::jsonapi::{FormatOptions, JsonApi, PageParams, Payload, RequestContext};
use crate::model::Place;

type CreateBody = RequestDocument<NewResource<JsonValue>>;
type UpdateBody = RequestDocument<ResourceChanges<JsonValue>>;

const PLACE_ATTRIBUTES: &[&str] = &["name", "location"];

fn place_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, Fault> {
    let Path(id) = path?;
    if id < 1 {
        return Err(Fault::bad_request("\"id\" must be larger than or equal to 1"));
    }
    Ok(id)
}

/// Checks client attributes against the place attribute names, then reads
/// them into `T`. Every place attribute is a non-empty string, and keys
/// outside [`PLACE_ATTRIBUTES`] are refused.
fn place_attributes<T: DeserializeOwned>(attributes: JsonValue, required: bool) -> Result<T, Fault> {
    let attributes = match attributes {
        JsonValue::Null => Map::new(),
        JsonValue::Object(obj) => obj,
        _ => return Err(Fault::bad_request("\"attributes\" must be an object")),
    };

    for &name in PLACE_ATTRIBUTES {
        match attributes.get(name) {
            Some(JsonValue::String(v)) if v.is_empty() => {
                return Err(Fault::bad_request(format!("\"{}\" is not allowed to be empty", name)));
            }
            Some(JsonValue::String(_)) => {}
            Some(_) => return Err(Fault::bad_request(format!("\"{}\" must be a string", name))),
            None if required => return Err(Fault::bad_request(format!("\"{}\" is required", name))),
            None => {}
        }
    }
    if let Some(key) = attributes.keys().find(|k| !PLACE_ATTRIBUTES.contains(&k.as_str())) {
        return Err(Fault::bad_request(format!("\"{}\" is not allowed", key)));
    }

    serde_json::from_value(JsonValue::Object(attributes)).map_err(|e| Fault::bad_request(e.to_string()))
}

fn reply(state: &AppState, ctx: &RequestContext, place: &Place) -> Result<JsonApi, Fault> {
    Ok(state
        .jsonapi
        .format(ctx, Payload::model(place)?, FormatOptions::default())?)
}

pub async fn list_places(
    State(state): State<AppState>,
    ctx: RequestContext,
    page: PageParams,
) -> Result<JsonApi, Fault> {
    let lib = Places::new(state.db.connection());

    let places = lib
        .list_places(page.limit(), page.offset())
        .await
        .map_err(Fault::internal)?;

    tracing::info!(request_id = %ctx.id, count = places.count, "listed places");
    let options = FormatOptions::default().with_pagination(page.context(places.count));
    Ok(state
        .jsonapi
        .format(&ctx, Payload::models(&places.rows)?, options)?)
}

pub async fn get_place(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<i64>, PathRejection>,
) -> Result<JsonApi, Fault> {
    let id = place_id(id)?;
    let lib = Places::new(state.db.connection());

    match lib.get_place(id).await.map_err(Fault::internal)? {
        Some(place) => reply(&state, &ctx, &place),
        None => Err(Fault::not_found()),
    }
}

pub async fn create_place(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<JsonApi, Fault> {
    let Json(body) = body?;
    let input: CreatePlace = place_attributes(body.data.attributes, true)?;

    let lib = Places::new(state.db.connection());
    let place = lib.create_place(input).await.map_err(Fault::internal)?;

    tracing::info!(request_id = %ctx.id, place_id = place.id, "created place");
    Ok(reply(&state, &ctx, &place)?.with_status(StatusCode::CREATED))
}

pub async fn update_place(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateBody>, JsonRejection>,
) -> Result<JsonApi, Fault> {
    let id = place_id(id)?;
    let Json(body) = body?;

    if let Some(resource_type) = &body.data.resource_type {
        if resource_type != "places" {
            return Err(Fault::bad_request("\"type\" must be one of [places]"));
        }
    }
    if !body.data.matches_id(id) {
        return Err(Fault::bad_request(
            "IDs passed in both path and body must match",
        ));
    }

    let changes: UpdatePlace = place_attributes(body.data.attributes, false)?;

    let lib = Places::new(state.db.connection());
    match lib.update_place(id, changes).await.map_err(Fault::internal)? {
        Some(place) => {
            tracing::info!(request_id = %ctx.id, place_id = place.id, "updated place");
            reply(&state, &ctx, &place)
        }
        None => Err(Fault::not_found()),
    }
}

pub async fn delete_place(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, Fault> {
    let id = place_id(id)?;
    let lib = Places::new(state.db.connection());

    if lib.delete_place(id).await.map_err(Fault::internal)? {
        tracing::info!(request_id = %ctx.id, place_id = id, "deleted place");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Fault::not_found())
    }
}
