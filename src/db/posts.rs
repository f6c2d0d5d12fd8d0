//! Post operations: ingest, inspect, atomic lease claim, verdict write.

use crate::error::{Error, Result};
use crate::model::post::{Attachment, NewPost, Post, PostId, PostStatus, lease_cutoff};
use crate::queue::WorkQueue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use std::time::Duration;
use uuid::Uuid;

const POST_COLUMNS: &str = "id, attachments, verdict, lease_begin, created_at";

impl super::Db {
    /// Ingest a new post.
    pub async fn submit_post(&self, new: NewPost) -> Result<Post> {
        let row: PostRow = sqlx::query_as(&format!(
            "INSERT INTO posts (id, attachments, created_at)
             VALUES ($1, $2, $3)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(Json(&new.attachments))
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;

        row.try_into_post()
    }

    /// Get a post by ID.
    pub async fn get_post(&self, id: PostId) -> Result<Post> {
        let row: Option<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(self.pool())
        .await?;

        row.ok_or_else(|| Error::NotFound(format!("post {id}")))?
            .try_into_post()
    }

    /// List posts oldest first, optionally filtered by derived status.
    pub async fn list_posts(
        &self,
        status: Option<PostStatus>,
        ttl: Duration,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let now = Utc::now();
        let cutoff = lease_cutoff(now, ttl);
        let status = status.map(|s| s.to_string());

        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts
             WHERE $1::text IS NULL
                OR ($1 = 'resolved' AND verdict IS NOT NULL)
                OR ($1 = 'leased' AND verdict IS NULL AND lease_begin > $2)
                OR ($1 = 'pending' AND verdict IS NULL AND (lease_begin IS NULL OR lease_begin <= $2))
             ORDER BY created_at ASC
             LIMIT $3"
        ))
        .bind(status)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(PostRow::try_into_post).collect()
    }
}

#[async_trait]
impl WorkQueue for super::Db {
    async fn try_claim(&self, now: DateTime<Utc>, ttl: Duration) -> Result<Option<Post>> {
        // One statement: pick the oldest eligible row under SKIP LOCKED and
        // stamp it. The outer predicate is re-checked against the locked row.
        let row: Option<PostRow> = sqlx::query_as(&format!(
            "UPDATE posts SET lease_begin = $1
             WHERE id = (
                 SELECT id FROM posts
                 WHERE jsonb_array_length(attachments) > 0
                   AND verdict IS NULL
                   AND (lease_begin IS NULL OR lease_begin <= $2)
                 ORDER BY created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             AND verdict IS NULL
             AND (lease_begin IS NULL OR lease_begin <= $2)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(now.timestamp())
        .bind(lease_cutoff(now, ttl))
        .fetch_optional(self.pool())
        .await?;

        row.map(PostRow::try_into_post).transpose()
    }

    async fn set_result(&self, id: PostId, verdict: bool) -> Result<()> {
        let rows_affected = sqlx::query("UPDATE posts SET verdict = $1 WHERE id = $2")
            .bind(verdict)
            .bind(id.0)
            .execute(self.pool())
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(Error::NotFound(format!("post {id}")));
        }
        Ok(())
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    attachments: Json<Vec<Attachment>>,
    verdict: Option<bool>,
    lease_begin: Option<i64>,
    created_at: DateTime<Utc>,
}

impl PostRow {
    fn try_into_post(self) -> Result<Post> {
        let lease_begin = self
            .lease_begin
            .map(|secs| {
                DateTime::from_timestamp(secs, 0)
                    .ok_or_else(|| Error::Other(format!("lease_begin out of range: {secs}")))
            })
            .transpose()?;

        Ok(Post {
            id: PostId(self.id),
            attachments: self.attachments.0,
            verdict: self.verdict,
            lease_begin,
            created_at: self.created_at,
        })
    }
}
