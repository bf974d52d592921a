use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::document::{Document, PrimaryData, Resource};

/// A storage record that knows how it is presented as a JSON:API resource.
///
/// `ATTRIBUTES` lists the serialized field names exposed as attributes. The
/// primary key `id` is never part of it, it becomes the resource id.
pub trait JsonApiModel: Serialize {
    const RESOURCE_TYPE: &'static str;
    const ATTRIBUTES: &'static [&'static str];
}

/// Builds the `data` section for one record (a JSON object) or many (a JSON
/// array of objects).
pub fn serialize<S: AsRef<str>>(
    resource_type: &str,
    attributes: &[S],
    records: &JsonValue,
) -> Document {
    let data = match records {
        JsonValue::Array(items) => PrimaryData::Many(
            items
                .iter()
                .map(|record| to_resource(resource_type, attributes, record))
                .collect(),
        ),
        record => PrimaryData::One(to_resource(resource_type, attributes, record)),
    };
    Document::from_data(data)
}

fn to_resource<S: AsRef<str>>(resource_type: &str, attributes: &[S], record: &JsonValue) -> Resource {
    let id = match record.get("id") {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let mut attrs = Map::new();
    for name in attributes {
        let name = name.as_ref();
        if name == "id" {
            continue;
        }
        if let Some(value) = record.get(name) {
            attrs.insert(dasherize(name), value.clone());
        }
    }

    Resource {
        id,
        resource_type: resource_type.to_string(),
        attributes: Some(attrs),
        relationships: None,
        links: None,
        meta: None,
    }
}

/// `created_at` and `createdAt` both become `created-at`. A run of capitals
/// is one word: `locationURL` becomes `location-url`, `HTMLParser` becomes
/// `html-parser`.
pub fn dasherize(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == ' ' || c == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            continue;
        }

        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let starts_word = prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower);
            if starts_word && !out.ends_with('-') {
                out.push('-');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
