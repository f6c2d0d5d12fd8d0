//! The work queue seam shared by every worker session.
//!
//! A `WorkQueue` exposes exactly the two mutations the dispatcher needs:
//! an atomic claim-and-stamp and a keyed verdict write. Implementations
//! must perform each claim as one atomic operation per document; there is
//! no process-level lock around claims.

pub mod memory;

pub use memory::MemoryQueue;

use crate::error::Result;
use crate::model::post::{Post, PostId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Find one eligible post and stamp `lease_begin = now` in the same
    /// atomic step. Returns `None` when nothing is eligible.
    ///
    /// Eligible: at least one attachment, no verdict, and no lease or a
    /// lease that began at or before `now - ttl`.
    async fn try_claim(&self, now: DateTime<Utc>, ttl: Duration) -> Result<Option<Post>>;

    /// Persist the verdict for a post. Idempotent; leaves the lease untouched.
    async fn set_result(&self, id: PostId, verdict: bool) -> Result<()>;
}
