// src/repositories/post_repository.rs - posts table access
use async_trait::async_trait;
use deadpool_postgres::Pool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::post::{NewPost, Post, PostChanges};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

const POST_COLUMNS: &str = "id, heading, text, file, created_at, updated_at";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("db error: {0}")]
    Db(#[from] tokio_postgres::Error),
    #[error("not found")]
    NotFound,
    #[error("other: {0}")]
    Other(String),
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn get_one(&self, id: Uuid) -> Result<Post, RepoError>;

    /// Newest first. `page` is 1-based; both values are clamped by [`page_window`].
    async fn get_order_list(&self, page: Option<u32>, limit: Option<u32>) -> Result<Vec<Post>, RepoError>;

    async fn create(&self, post: NewPost) -> Result<Post, RepoError>;

    async fn update(&self, changes: PostChanges) -> Result<Post, RepoError>;

    /// Deletes the post and returns the row as it was before deletion.
    async fn remove(&self, id: Uuid) -> Result<Post, RepoError>;
}

/// Resolves optional pagination input to `(limit, offset)`.
pub fn page_window(page: Option<u32>, limit: Option<u32>) -> (i64, i64) {
    let page = page.unwrap_or(DEFAULT_PAGE).max(1) as i64;
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as i64;
    (limit, (page - 1) * limit)
}

#[derive(Clone)]
pub struct PgPostStore {
    pool: Pool,
}

impl PgPostStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates the `posts` table on a fresh database.
    pub async fn ensure_schema(&self) -> Result<(), RepoError> {
        let client = self.pool.get().await?;
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS posts (
                    id UUID PRIMARY KEY,
                    heading TEXT,
                    text TEXT,
                    file TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    updated_at TIMESTAMPTZ
                );
                CREATE INDEX IF NOT EXISTS posts_created_at_idx ON posts (created_at DESC, id DESC);",
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn get_one(&self, id: Uuid) -> Result<Post, RepoError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&id]).await?.ok_or(RepoError::NotFound)?;
        Ok(Post::from_row(&row)?)
    }

    async fn get_order_list(&self, page: Option<u32>, limit: Option<u32>) -> Result<Vec<Post>, RepoError> {
        let (limit, offset) = page_window(page, limit);
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM posts ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            POST_COLUMNS
        );
        let rows = client.query(sql.as_str(), &[&limit, &offset]).await?;
        rows.iter()
            .map(|row| Post::from_row(row).map_err(RepoError::from))
            .collect()
    }

    async fn create(&self, post: NewPost) -> Result<Post, RepoError> {
        let client = self.pool.get().await?;
        let id = Uuid::new_v4();
        let sql = format!(
            "INSERT INTO posts (id, heading, text, file) VALUES ($1, $2, $3, $4) RETURNING {}",
            POST_COLUMNS
        );
        let row = client
            .query_one(sql.as_str(), &[&id, &post.heading, &post.text, &post.file])
            .await?;
        Ok(Post::from_row(&row)?)
    }

    async fn update(&self, changes: PostChanges) -> Result<Post, RepoError> {
        let client = self.pool.get().await?;
        // NULL parameters keep the stored value
        let sql = format!(
            "UPDATE posts SET
                heading = COALESCE($2, heading),
                text = COALESCE($3, text),
                file = COALESCE($4, file),
                updated_at = now()
             WHERE id = $1
             RETURNING {}",
            POST_COLUMNS
        );
        let row = client
            .query_opt(
                sql.as_str(),
                &[&changes.id, &changes.heading, &changes.text, &changes.file],
            )
            .await?
            .ok_or(RepoError::NotFound)?;
        Ok(Post::from_row(&row)?)
    }

    async fn remove(&self, id: Uuid) -> Result<Post, RepoError> {
        let client = self.pool.get().await?;
        let sql = format!("DELETE FROM posts WHERE id = $1 RETURNING {}", POST_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&id]).await?.ok_or(RepoError::NotFound)?;
        Ok(Post::from_row(&row)?)
    }
}
