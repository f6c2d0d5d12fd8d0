//! Postgres-backed post store.
//!
//! All shared state lives in the `posts` table. Every worker session
//! claims through the same pool, so its size caps how many claims and
//! verdict writes can be in flight at once. Statements are in [`posts`].

pub mod posts;

use crate::error::{Error, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// Handle to the post store. Cheap to share behind an `Arc`.
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Open a pool of at most `max_connections` to the post store.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!(max_connections, "post store connected");
        Ok(Self { pool })
    }

    /// Bring the `posts` schema up to date.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Other(format!("posts schema migration failed: {e}")))
    }

    /// Fails unless the `posts` table is reachable.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1 FROM posts LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}
