use anyhow::Result;
use libsql::Connection;
use serde::{Deserialize, Serialize};

use crate::model::{Place, RowsAndCount};

const PLACE_COLUMNS: &str = "id, name, location, picture, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlace {
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlace {
    pub name: Option<String>,
    pub location: Option<String>,
}

/// Place storage. Deleted places keep their row with `deleted_at` set and
/// are invisible to every query here.
pub struct Places<'a> {
    conn: &'a Connection,
}

impl<'a> Places<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Newest first, with the total number of live places.
    pub async fn list_places(&self, limit: u64, offset: u64) -> Result<RowsAndCount<Place>> {
        let query = format!(
            r#"
            SELECT {PLACE_COLUMNS}
            FROM places
            WHERE deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        );

        let mut rows = self
            .conn
            .query(&query, libsql::params![limit as i64, offset as i64])
            .await?;

        let mut places = Vec::new();
        while let Some(row) = rows.next().await? {
            places.push(self.row_to_place(&row)?);
        }

        let count = self.count_places().await?;
        Ok(RowsAndCount { rows: places, count })
    }

    async fn count_places(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM places WHERE deleted_at IS NULL", ())
            .await?;

        match rows.next().await? {
            Some(row) => {
                let count: i64 = row.get(0)?;
                Ok(count.max(0) as u64)
            }
            None => Ok(0),
        }
    }

    pub async fn get_place(&self, id: i64) -> Result<Option<Place>> {
        let query = format!("SELECT {PLACE_COLUMNS} FROM places WHERE id = ? AND deleted_at IS NULL");

        let mut rows = self.conn.query(&query, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(self.row_to_place(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn create_place(&self, input: CreatePlace) -> Result<Place> {
        let query = format!(
            r#"
            INSERT INTO places (name, location)
            VALUES (?, ?)
            RETURNING {PLACE_COLUMNS}
            "#
        );

        let mut rows = self
            .conn
            .query(&query, libsql::params![input.name, input.location])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(self.row_to_place(&row)?)
        } else {
            anyhow::bail!("failed to create a new place")
        }
    }

    pub async fn update_place(&self, id: i64, input: UpdatePlace) -> Result<Option<Place>> {
        if self.get_place(id).await?.is_none() {
            return Ok(None);
        }

        let mut updates = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(name) = input.name {
            updates.push("name = ?");
            params.push(name.into());
        }
        if let Some(location) = input.location {
            updates.push("location = ?");
            params.push(location.into());
        }

        if updates.is_empty() {
            return self.get_place(id).await;
        }

        updates.push("updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')");
        params.push(id.into());

        let query = format!(
            "UPDATE places SET {} WHERE id = ? AND deleted_at IS NULL",
            updates.join(", ")
        );

        self.conn.execute(&query, params).await?;
        self.get_place(id).await
    }

    /// Returns false when there was no live place to delete.
    pub async fn delete_place(&self, id: i64) -> Result<bool> {
        let result = self
            .conn
            .execute(
                "UPDATE places SET deleted_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ? AND deleted_at IS NULL",
                libsql::params![id],
            )
            .await?;
        Ok(result > 0)
    }

    fn row_to_place(&self, row: &libsql::Row) -> Result<Place> {
        Ok(Place {
            id: row.get(0)?,
            name: row.get(1)?,
            location: row.get(2)?,
            picture: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}
