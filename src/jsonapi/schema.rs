//! Structural validation of outgoing JSON:API documents.
//!
//! The validator walks an arbitrary JSON value and records every place it
//! departs from the document shape. It never fails on malformed input, the
//! caller decides what a non-empty report means.

use serde_json::{Map, Value as JsonValue};
use std::fmt;
use url::Url;

const DOCUMENT_KEYS: &[&str] = &["data", "errors", "meta", "jsonapi", "links", "included"];
const RESOURCE_KEYS: &[&str] = &["id", "type", "attributes", "relationships", "links", "meta"];
const RELATIONSHIP_KEYS: &[&str] = &["links", "data", "meta"];
const ERROR_KEYS: &[&str] = &[
    "id", "links", "status", "code", "title", "detail", "source", "meta",
];
const ERROR_SOURCE_KEYS: &[&str] = &["pointer", "parameter"];
const ERROR_STRING_KEYS: &[&str] = &["status", "code", "title", "detail"];
const JSONAPI_KEYS: &[&str] = &["version", "meta"];
const LINK_OBJECT_KEYS: &[&str] = &["href", "meta"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer to the offending member, empty for the document root.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "document {}", self.message)
        } else {
            write!(f, "{} {}", self.path, self.message)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    fn push(&mut self, path: &str, message: impl Into<String>) {
        self.violations.push(Violation {
            path: path.to_string(),
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Checks `candidate` against the JSON:API top-level document shape.
pub fn validate(candidate: &JsonValue) -> ValidationReport {
    let mut report = ValidationReport::default();

    if let Some(doc) = object_at(&mut report, "", candidate) {
        check_document(&mut report, doc);
    }
    report
}

/// Same as [`validate`] for a document already known to be a JSON object.
pub fn validate_members(doc: &Map<String, JsonValue>) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_document(&mut report, doc);
    report
}

fn check_document(report: &mut ValidationReport, doc: &Map<String, JsonValue>) {
    closed_keys(report, "", doc, DOCUMENT_KEYS);

    match (doc.get("data"), doc.get("errors")) {
        (Some(_), Some(_)) => report.push("", "must not contain both \"data\" and \"errors\""),
        (None, None) => report.push("", "must contain either \"data\" or \"errors\""),
        _ => {}
    }

    if let Some(data) = doc.get("data") {
        check_primary_data(report, "/data", data);
    }

    if let Some(errors) = doc.get("errors") {
        match errors.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    check_error(report, &format!("/errors/{}", i), item);
                }
            }
            None => report.push("/errors", "must be an array"),
        }
    }

    if let Some(meta) = doc.get("meta") {
        object_at(report, "/meta", meta);
    }

    if let Some(jsonapi) = doc.get("jsonapi") {
        if let Some(obj) = object_at(report, "/jsonapi", jsonapi) {
            closed_keys(report, "/jsonapi", obj, JSONAPI_KEYS);
            if let Some(version) = obj.get("version") {
                string_at(report, "/jsonapi/version", version);
            }
            if let Some(meta) = obj.get("meta") {
                object_at(report, "/jsonapi/meta", meta);
            }
        }
    }

    if let Some(links) = doc.get("links") {
        check_links(report, "/links", links);
    }

    if let Some(included) = doc.get("included") {
        match included.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    check_resource(report, &format!("/included/{}", i), item);
                }
            }
            None => report.push("/included", "must be an array"),
        }
    }
}

/// Primary data and relationship linkage share one shape: a resource, an
/// identifier, or an array of either. Identifier members are a subset of
/// resource members, so a resource check covers both.
fn check_primary_data(report: &mut ValidationReport, path: &str, value: &JsonValue) {
    match value {
        JsonValue::Object(_) => check_resource(report, path, value),
        JsonValue::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                check_resource(report, &format!("{}/{}", path, i), item);
            }
        }
        _ => report.push(
            path,
            "must be a resource object, a resource identifier or an array of them",
        ),
    }
}

fn check_resource(report: &mut ValidationReport, path: &str, value: &JsonValue) {
    let Some(obj) = object_at(report, path, value) else {
        return;
    };
    closed_keys(report, path, obj, RESOURCE_KEYS);

    if !obj.contains_key("id") {
        report.push(path, "is missing required member \"id\"");
    }

    match obj.get("type") {
        None => report.push(path, "is missing required member \"type\""),
        Some(JsonValue::String(s)) if s.is_empty() => {
            report.push(&format!("{}/type", path), "must not be empty")
        }
        Some(JsonValue::String(_)) => {}
        Some(_) => report.push(&format!("{}/type", path), "must be a string"),
    }

    if let Some(attributes) = obj.get("attributes") {
        object_at(report, &format!("{}/attributes", path), attributes);
    }

    if let Some(relationships) = obj.get("relationships") {
        let rel_path = format!("{}/relationships", path);
        if let Some(rels) = object_at(report, &rel_path, relationships) {
            for (name, rel) in rels {
                check_relationship(report, &format!("{}/{}", rel_path, name), rel);
            }
        }
    }

    if let Some(links) = obj.get("links") {
        check_links(report, &format!("{}/links", path), links);
    }

    if let Some(meta) = obj.get("meta") {
        object_at(report, &format!("{}/meta", path), meta);
    }
}

fn check_relationship(report: &mut ValidationReport, path: &str, value: &JsonValue) {
    let Some(obj) = object_at(report, path, value) else {
        return;
    };
    closed_keys(report, path, obj, RELATIONSHIP_KEYS);

    if let Some(links) = obj.get("links") {
        check_links(report, &format!("{}/links", path), links);
    }
    if let Some(data) = obj.get("data") {
        check_primary_data(report, &format!("{}/data", path), data);
    }
    if let Some(meta) = obj.get("meta") {
        object_at(report, &format!("{}/meta", path), meta);
    }
}

fn check_error(report: &mut ValidationReport, path: &str, value: &JsonValue) {
    let Some(obj) = object_at(report, path, value) else {
        return;
    };
    closed_keys(report, path, obj, ERROR_KEYS);

    for key in ERROR_STRING_KEYS {
        if let Some(v) = obj.get(*key) {
            string_at(report, &format!("{}/{}", path, key), v);
        }
    }

    if let Some(links) = obj.get("links") {
        let links_path = format!("{}/links", path);
        if let Some(links_obj) = object_at(report, &links_path, links) {
            closed_keys(report, &links_path, links_obj, &["about"]);
            if let Some(about) = links_obj.get("about") {
                check_link(report, &format!("{}/about", links_path), about);
            }
        }
    }

    if let Some(source) = obj.get("source") {
        let source_path = format!("{}/source", path);
        if let Some(source_obj) = object_at(report, &source_path, source) {
            closed_keys(report, &source_path, source_obj, ERROR_SOURCE_KEYS);
            for key in ERROR_SOURCE_KEYS {
                if let Some(v) = source_obj.get(*key) {
                    string_at(report, &format!("{}/{}", source_path, key), v);
                }
            }
        }
    }

    if let Some(meta) = obj.get("meta") {
        object_at(report, &format!("{}/meta", path), meta);
    }
}

fn check_links(report: &mut ValidationReport, path: &str, value: &JsonValue) {
    if let Some(links) = object_at(report, path, value) {
        for (name, link) in links {
            check_link(report, &format!("{}/{}", path, name), link);
        }
    }
}

fn check_link(report: &mut ValidationReport, path: &str, value: &JsonValue) {
    match value {
        JsonValue::String(s) => {
            if !is_uri_reference(s) {
                report.push(path, "must be a valid URI");
            }
        }
        JsonValue::Object(obj) => {
            closed_keys(report, path, obj, LINK_OBJECT_KEYS);
            match obj.get("href") {
                Some(JsonValue::String(href)) if is_uri_reference(href) => {}
                Some(_) => report.push(&format!("{}/href", path), "must be a valid URI"),
                None => report.push(path, "is missing required member \"href\""),
            }
            match obj.get("meta") {
                Some(meta) => {
                    object_at(report, &format!("{}/meta", path), meta);
                }
                None => report.push(path, "is missing required member \"meta\""),
            }
        }
        _ => report.push(path, "must be a URI string or a link object"),
    }
}

/// Links are validated before they are resolved against the base URL, so
/// relative references are accepted here.
fn is_uri_reference(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    matches!(Url::parse(s), Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase))
}

fn object_at<'a>(
    report: &mut ValidationReport,
    path: &str,
    value: &'a JsonValue,
) -> Option<&'a Map<String, JsonValue>> {
    let obj = value.as_object();
    if obj.is_none() {
        report.push(path, "must be an object");
    }
    obj
}

fn string_at(report: &mut ValidationReport, path: &str, value: &JsonValue) {
    if !value.is_string() {
        report.push(path, "must be a string");
    }
}

fn closed_keys(
    report: &mut ValidationReport,
    path: &str,
    obj: &Map<String, JsonValue>,
    allowed: &[&str],
) {
    for key in obj.keys() {
        if !allowed.contains(&key.as_str()) {
            report.push(&format!("{}/{}", path, key), "is not allowed");
        }
    }
}
