use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use url::Url;

use super::context::RequestContext;
use super::document::{Document, ErrorObject, MEDIA_TYPE, Meta};
use super::pagination::PaginationContext;
use super::schema;
use super::serializer::{self, JsonApiModel};
use crate::error::{Fault, JsonApiError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Log violations and send the document anyway.
    #[default]
    Advisory,
    /// Fail the request with a 500 when the document is malformed.
    Strict,
}

/// Process-wide formatter settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct JsonApiConfig {
    pub base_url: Url,
    pub meta: Meta,
    pub validation: ValidationMode,
}

impl JsonApiConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            meta: Meta::new(),
            validation: ValidationMode::default(),
        }
    }
}

/// What a handler hands to the formatter.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    /// Records of a [`JsonApiModel`], serialized with the model's own type
    /// and attribute list.
    Models {
        resource_type: &'static str,
        attributes: &'static [&'static str],
        records: JsonValue,
    },
    /// Anything else: a document, or records to be serialized with the type
    /// and attributes given in [`FormatOptions`].
    Raw(JsonValue),
}

impl Payload {
    pub fn model<T: JsonApiModel>(record: &T) -> Result<Self, JsonApiError> {
        Ok(Payload::Models {
            resource_type: T::RESOURCE_TYPE,
            attributes: T::ATTRIBUTES,
            records: serde_json::to_value(record)?,
        })
    }

    pub fn models<T: JsonApiModel>(records: &[T]) -> Result<Self, JsonApiError> {
        Ok(Payload::Models {
            resource_type: T::RESOURCE_TYPE,
            attributes: T::ATTRIBUTES,
            records: serde_json::to_value(records)?,
        })
    }

    fn is_empty(&self) -> bool {
        match self {
            Payload::Empty => true,
            Payload::Models { records, .. } | Payload::Raw(records) => is_empty_value(records),
        }
    }
}

impl From<JsonValue> for Payload {
    fn from(value: JsonValue) -> Self {
        Payload::Raw(value)
    }
}

fn is_empty_value(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    pub meta: Meta,
    pub pagination: Option<PaginationContext>,
    pub resource_type: Option<String>,
    pub attributes: Option<Vec<String>>,
}

impl FormatOptions {
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationContext) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_presentation<S: Into<String>>(
        mut self,
        resource_type: impl Into<String>,
        attributes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }
}

/// A finished document on its way to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonApi {
    pub status: StatusCode,
    pub body: JsonValue,
}

impl JsonApi {
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl IntoResponse for JsonApi {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.body) {
            Ok(bytes) => (
                self.status,
                [(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE))],
                bytes,
            )
                .into_response(),
            Err(e) => Fault::internal(e).into_response(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Formatter {
    config: Arc<JsonApiConfig>,
}

impl Formatter {
    pub fn new(config: JsonApiConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &JsonApiConfig {
        &self.config
    }

    /// `{id: <request id>}` overlaid with the configured default meta.
    pub fn base_meta(&self, request_id: &str) -> Meta {
        let mut meta = Meta::new();
        meta.insert("id".to_string(), JsonValue::from(request_id));
        merge(&mut meta, self.config.meta.clone());
        meta
    }

    pub fn format(
        &self,
        ctx: &RequestContext,
        payload: Payload,
        options: FormatOptions,
    ) -> Result<JsonApi, JsonApiError> {
        let mut meta = self.base_meta(&ctx.id);
        merge(&mut meta, options.meta);

        if payload.is_empty() {
            let mut doc = Map::new();
            doc.insert("data".to_string(), JsonValue::Array(vec![]));
            doc.insert("meta".to_string(), JsonValue::Object(meta));
            return Ok(JsonApi {
                status: StatusCode::OK,
                body: JsonValue::Object(doc),
            });
        }

        if let Some(pagination) = &options.pagination {
            merge(&mut meta, pagination.meta());
        }

        let mut doc = match (payload, options.resource_type, options.attributes) {
            (
                Payload::Models {
                    resource_type,
                    attributes,
                    records,
                },
                _,
                _,
            ) => document_members(serializer::serialize(resource_type, attributes, &records))?,
            (Payload::Raw(records), Some(resource_type), Some(attributes)) => {
                document_members(serializer::serialize(
                    &resource_type,
                    attributes.as_slice(),
                    &records,
                ))?
            }
            (Payload::Raw(value), _, _) => pass_through(value),
            (Payload::Empty, _, _) => Map::new(),
        };

        let report = schema::validate_members(&doc);
        if !report.is_valid() {
            match self.config.validation {
                ValidationMode::Advisory => {
                    tracing::warn!(request_id = %ctx.id, violations = %report, "response is not a valid JSON:API document");
                }
                ValidationMode::Strict => return Err(JsonApiError::Invalid(report)),
            }
        }

        let mut links = take_object(&mut doc, "links");
        if !links.contains_key("self") {
            links.insert("self".to_string(), JsonValue::from(ctx.url.as_str()));
        }
        for link in links.values_mut() {
            self.absolutize(link);
        }
        doc.insert("links".to_string(), JsonValue::Object(links));

        let mut doc_meta = take_object(&mut doc, "meta");
        merge(&mut doc_meta, meta);
        doc.insert("meta".to_string(), JsonValue::Object(doc_meta));

        Ok(JsonApi {
            status: StatusCode::OK,
            body: JsonValue::Object(doc),
        })
    }

    /// Error document for a terminal fault.
    pub fn error_document(&self, request_id: &str, status: StatusCode, detail: &str) -> Document {
        let error = ErrorObject {
            title: Some(status.canonical_reason().unwrap_or("Unknown Error").to_string()),
            status: Some(status.as_u16().to_string()),
            detail: Some(detail.to_string()),
            ..Default::default()
        };
        let mut doc = Document::from_errors(vec![error]);
        doc.meta = Some(self.base_meta(request_id));
        doc
    }

    fn absolutize(&self, link: &mut JsonValue) {
        match link {
            JsonValue::String(url) => *url = self.resolve(url),
            JsonValue::Object(obj) => {
                if let Some(JsonValue::String(href)) = obj.get_mut("href") {
                    *href = self.resolve(href);
                }
            }
            _ => {}
        }
    }

    /// URLs with a host are left alone, everything else is resolved against
    /// the base URL.
    pub fn resolve(&self, url: &str) -> String {
        let has_host = Url::parse(url).map(|u| u.has_host()).unwrap_or(false);
        if has_host {
            return url.to_string();
        }
        match self.config.base_url.join(url) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => url.to_string(),
        }
    }
}

fn document_members(document: Document) -> Result<Map<String, JsonValue>, JsonApiError> {
    Ok(pass_through(document.to_value()?))
}

/// Objects carrying `data` or `errors` are treated as documents, any other
/// value becomes the primary data of a new document.
fn pass_through(value: JsonValue) -> Map<String, JsonValue> {
    match value {
        JsonValue::Object(obj) if obj.contains_key("data") || obj.contains_key("errors") => obj,
        other => {
            let mut doc = Map::new();
            doc.insert("data".to_string(), other);
            doc
        }
    }
}

/// Removes the object stored under `key`, anything that is not an object is
/// discarded.
fn take_object(doc: &mut Map<String, JsonValue>, key: &str) -> Map<String, JsonValue> {
    match doc.remove(key) {
        Some(JsonValue::Object(obj)) => obj,
        _ => Map::new(),
    }
}

/// Deep merge, values from `source` win. Nested objects are merged key by key.
pub fn merge(target: &mut Map<String, JsonValue>, source: Map<String, JsonValue>) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(JsonValue::Object(existing)), JsonValue::Object(incoming)) => {
                merge(existing, incoming);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}
