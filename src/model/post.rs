//! Post data model.
//!
//! A post is a unit of classification work: an ordered list of attachments,
//! a tri-state verdict, and an optional lease stamp set by the lease manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A queued post awaiting (or holding) a classification verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Store-assigned identifier. Carried through, never interpreted.
    pub id: PostId,

    /// Attachments in original order.
    pub attachments: Vec<Attachment>,

    /// `None` until a verdict has been written.
    pub verdict: Option<bool>,

    /// When the current lease was taken, if any.
    pub lease_begin: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Photo references in attachment order. Other attachment kinds are dropped.
    pub fn photos(&self) -> Vec<&str> {
        self.attachments
            .iter()
            .filter_map(Attachment::photo_ref)
            .collect()
    }

    /// Derived lifecycle status relative to `now` and the lease TTL.
    pub fn status(&self, now: DateTime<Utc>, ttl: std::time::Duration) -> PostStatus {
        if self.verdict.is_some() {
            return PostStatus::Resolved;
        }
        match self.lease_begin {
            Some(begin) if !lease_expired(begin, now, ttl) => PostStatus::Leased,
            _ => PostStatus::Pending,
        }
    }
}

/// A lease stamped at `begin` no longer blocks re-claim once `ttl` has passed.
///
/// Leases are stored at whole-second resolution, so the comparison is done
/// in epoch seconds to agree with the database predicate.
pub fn lease_expired(begin: DateTime<Utc>, now: DateTime<Utc>, ttl: std::time::Duration) -> bool {
    begin.timestamp() <= lease_cutoff(now, ttl)
}

/// Latest lease-begin (epoch seconds) that counts as expired at `now`.
pub fn lease_cutoff(now: DateTime<Utc>, ttl: std::time::Duration) -> i64 {
    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    now.timestamp().saturating_sub(ttl_secs)
}

/// Newtype for post IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// A post attachment. Only photos carry a payload the worker can use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attachment {
    Photo { photo_ref: String },
    #[serde(other)]
    Other,
}

impl Attachment {
    pub fn photo(photo_ref: impl Into<String>) -> Self {
        Attachment::Photo {
            photo_ref: photo_ref.into(),
        }
    }

    pub fn photo_ref(&self) -> Option<&str> {
        match self {
            Attachment::Photo { photo_ref } => Some(photo_ref),
            Attachment::Other => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Where a post is in its lifecycle. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    /// Unresolved and claimable (never leased, or lease expired).
    Pending,
    /// Held by a worker session within the lease TTL.
    Leased,
    /// Verdict written. Terminal.
    Resolved,
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PostStatus::Pending => "pending",
            PostStatus::Leased => "leased",
            PostStatus::Resolved => "resolved",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PostStatus {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PostStatus::Pending),
            "leased" => Ok(PostStatus::Leased),
            "resolved" => Ok(PostStatus::Resolved),
            other => Err(crate::error::Error::Other(format!(
                "unknown post status: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// New Post (builder)
// ---------------------------------------------------------------------------

/// Builder for ingesting a post.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub attachments: Vec<Attachment>,
}

impl NewPost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn photo(mut self, photo_ref: impl Into<String>) -> Self {
        self.attachments.push(Attachment::photo(photo_ref));
        self
    }

    pub fn other(mut self) -> Self {
        self.attachments.push(Attachment::Other);
        self
    }
}
