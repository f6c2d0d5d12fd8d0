//! In-process work queue.
//!
//! Same claim semantics as the Postgres store, over a vector of posts.
//! Each claim holds the store lock only for the match-and-stamp step, the
//! in-memory equivalent of a single conditional document update.

use crate::error::{Error, Result};
use crate::model::post::{NewPost, Post, PostId, lease_cutoff};
use crate::queue::WorkQueue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MemoryQueue {
    posts: Mutex<Vec<Post>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a post. Returns the stored document.
    pub fn insert(&self, new: NewPost) -> Result<Post> {
        let post = Post {
            id: PostId::new(),
            attachments: new.attachments,
            verdict: None,
            lease_begin: None,
            created_at: Utc::now(),
        };
        self.lock()?.push(post.clone());
        Ok(post)
    }

    /// Snapshot a post by ID.
    pub fn get(&self, id: PostId) -> Result<Post> {
        self.lock()?
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("post {id}")))
    }

    /// Snapshot every post in insertion order.
    pub fn all(&self) -> Result<Vec<Post>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Post>>> {
        self.posts
            .lock()
            .map_err(|_| Error::Other("memory queue lock poisoned".to_string()))
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn try_claim(&self, now: DateTime<Utc>, ttl: Duration) -> Result<Option<Post>> {
        let cutoff = lease_cutoff(now, ttl);
        // Stored at whole-second resolution, like the BIGINT column.
        let stamp = DateTime::from_timestamp(now.timestamp(), 0)
            .ok_or_else(|| Error::Other(format!("timestamp out of range: {now}")))?;

        let mut posts = self.lock()?;
        let eligible = posts.iter_mut().find(|p| {
            !p.attachments.is_empty()
                && p.verdict.is_none()
                && p.lease_begin.is_none_or(|begin| begin.timestamp() <= cutoff)
        });

        Ok(eligible.map(|post| {
            post.lease_begin = Some(stamp);
            post.clone()
        }))
    }

    async fn set_result(&self, id: PostId, verdict: bool) -> Result<()> {
        let mut posts = self.lock()?;
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("post {id}")))?;
        post.verdict = Some(verdict);
        Ok(())
    }
}
