use crate::jsonapi::JsonApiModel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub picture: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl JsonApiModel for Place {
    const RESOURCE_TYPE: &'static str = "places";
    const ATTRIBUTES: &'static [&'static str] =
        &["name", "location", "picture", "created_at", "updated_at"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub author: Option<String>,
    pub item: Option<String>,
    pub photo: Option<String>,
    pub body: Option<String>,
    pub reaction: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A page of rows together with the number of rows matching the query.
#[derive(Debug, Clone, PartialEq)]
pub struct RowsAndCount<T> {
    pub rows: Vec<T>,
    pub count: u64,
}
