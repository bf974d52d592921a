use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Request body envelope: `{"data": ...}`.
#[derive(Debug, Deserialize)]
pub struct RequestDocument<T> {
    pub data: T,
}

/// A resource sent by a client to be created.
#[derive(Debug, Deserialize)]
pub struct NewResource<A> {
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub attributes: A,
}

/// A resource sent by a client to be updated. Every attribute is optional.
#[derive(Debug, Deserialize)]
pub struct ResourceChanges<A> {
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub id: Option<JsonValue>,
    #[serde(default)]
    pub attributes: A,
}

impl<A> ResourceChanges<A> {
    /// Ids arrive as JSON:API strings or as bare numbers, both are accepted.
    pub fn matches_id(&self, id: i64) -> bool {
        match &self.id {
            Some(JsonValue::Number(n)) => n.as_i64() == Some(id),
            Some(JsonValue::String(s)) => s.trim().parse::<i64>().ok() == Some(id),
            _ => false,
        }
    }
}
