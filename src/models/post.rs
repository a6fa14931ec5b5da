// src/models/post.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub heading: Option<String>,
    pub text: Option<String>,
    /// Identifier returned by the file store for the attached upload
    pub file: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            heading: row.try_get("heading")?,
            text: row.try_get("text")?,
            file: row.try_get("file")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Row to insert. The id and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub heading: Option<String>,
    pub text: Option<String>,
    pub file: Option<String>,
}

/// Partial update; `None` leaves the stored column untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct PostChanges {
    pub id: Uuid,
    pub heading: Option<String>,
    pub text: Option<String>,
    pub file: Option<String>,
}
