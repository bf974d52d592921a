use anyhow::Result;
use chrono::{DateTime, Utc};
use libsql::Connection;
use serde_json::{Map, Value as JsonValue};

use crate::model::Review;

const REVIEW_COLUMNS: &str = "id, author, item, photo, body, reaction, created_at, updated_at";

pub struct Posts<'a> {
    conn: &'a Connection,
}

impl<'a> Posts<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Every live review, newest first.
    pub async fn list_reviews(&self) -> Result<Vec<Review>> {
        let query = format!(
            r#"
            SELECT {REVIEW_COLUMNS}
            FROM reviews
            WHERE deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            "#
        );

        let mut rows = self.conn.query(&query, ()).await?;

        let mut reviews = Vec::new();
        while let Some(row) = rows.next().await? {
            reviews.push(Review {
                id: row.get(0)?,
                author: row.get(1)?,
                item: row.get(2)?,
                photo: row.get(3)?,
                body: row.get(4)?,
                reaction: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            });
        }

        Ok(reviews)
    }
}

/// UTC calendar day of a stored timestamp, `YYYY-MM-DD`.
fn day_of(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(ts) => ts.with_timezone(&Utc).format("%Y-%m-%d").to_string(),
        Err(_) => timestamp.chars().take(10).collect(),
    }
}

/// Groups reviews by day and then by item: `{day: {item: [review, ..]}}`.
///
/// Input order is kept inside every group, so newest-first reviews give
/// newest days first. Reviews without an item land under `"null"`.
pub fn group_posts(reviews: &[Review]) -> Result<Map<String, JsonValue>> {
    let mut posts: Map<String, JsonValue> = Map::new();

    for review in reviews {
        let day = posts
            .entry(day_of(&review.created_at))
            .or_insert_with(|| JsonValue::Object(Map::new()));
        let JsonValue::Object(by_item) = day else {
            anyhow::bail!("post group for {} is not an object", review.created_at);
        };

        let item = review.item.clone().unwrap_or_else(|| "null".to_string());
        let group = by_item
            .entry(item)
            .or_insert_with(|| JsonValue::Array(Vec::new()));
        if let JsonValue::Array(group) = group {
            group.push(serde_json::to_value(review)?);
        }
    }

    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn review(id: i64, item: Option<&str>, created_at: &str) -> Review {
        Review {
            id,
            author: Some("1".to_string()),
            item: item.map(str::to_string),
            photo: None,
            body: Some("tasty".to_string()),
            reaction: None,
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    #[test]
    fn test_day_of() {
        assert_eq!(day_of("2017-03-04T23:30:00.000Z"), "2017-03-04");
        assert_eq!(day_of("2017-03-04T23:30:00-02:00"), "2017-03-05");
        assert_eq!(day_of("2017-03-04 10:00:00"), "2017-03-04");
    }

    #[test]
    fn test_group_posts() {
        let reviews = vec![
            review(4, Some("7"), "2017-03-05T10:00:00.000Z"),
            review(3, None, "2017-03-05T09:00:00.000Z"),
            review(2, Some("7"), "2017-03-04T18:00:00.000Z"),
            review(1, Some("7"), "2017-03-04T08:00:00.000Z"),
        ];

        let posts = group_posts(&reviews).unwrap();
        let days: Vec<&String> = posts.keys().collect();
        assert_eq!(days, vec!["2017-03-05", "2017-03-04"]);

        let latest = posts["2017-03-05"].as_object().unwrap();
        assert_eq!(latest["7"][0]["id"], 4);
        assert_eq!(latest["null"][0]["id"], 3);

        let earlier = posts["2017-03-04"]["7"].as_array().unwrap();
        let ids: Vec<i64> = earlier.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_list_reviews_skips_deleted() {
        let db = Database::open(":memory:").await.unwrap();
        let conn = db.connection();
        conn.execute(
            "INSERT INTO reviews (item, body, created_at) VALUES ('1', 'old', '2017-01-01T00:00:00.000Z')",
            (),
        )
        .await
        .unwrap();
        conn.execute(
            "INSERT INTO reviews (item, body, created_at) VALUES ('1', 'new', '2017-01-02T00:00:00.000Z')",
            (),
        )
        .await
        .unwrap();
        conn.execute(
            "INSERT INTO reviews (item, body, deleted_at) VALUES ('2', 'gone', '2017-01-03T00:00:00.000Z')",
            (),
        )
        .await
        .unwrap();

        let reviews = Posts::new(conn).list_reviews().await.unwrap();
        let bodies: Vec<&str> = reviews.iter().filter_map(|r| r.body.as_deref()).collect();
        assert_eq!(bodies, vec!["new", "old"]);
    }
}
