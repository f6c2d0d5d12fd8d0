//! Lease manager: claims one eligible post at a time for a worker session.
//!
//! Exclusivity comes entirely from the atomicity of [`WorkQueue::try_claim`].
//! Any number of managers may share one queue; none of them lock anything.

use crate::model::post::Post;
use crate::queue::WorkQueue;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Lease timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseConfig {
    /// How long a claimed but unresolved post blocks re-claim.
    pub ttl: Duration,
    /// Wait between claim attempts when nothing is eligible.
    pub poll_interval: Duration,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Claims posts from a shared queue on behalf of one session.
#[derive(Clone)]
pub struct LeaseManager {
    queue: Arc<dyn WorkQueue>,
    config: LeaseConfig,
}

impl LeaseManager {
    pub fn new(queue: Arc<dyn WorkQueue>, config: LeaseConfig) -> Self {
        Self { queue, config }
    }

    pub fn config(&self) -> LeaseConfig {
        self.config
    }

    /// Block until a post is claimed.
    ///
    /// Store failures are retried the same way as an empty queue; the
    /// caller only ever sees a successfully leased post.
    pub async fn claim_next(&self) -> Post {
        match self.claim_next_or(std::future::pending::<Infallible>()).await {
            Ok(post) => post,
            Err(never) => match never {},
        }
    }

    /// Like [`claim_next`](Self::claim_next), but gives up as soon as
    /// `interrupt` completes between attempts, returning its output.
    ///
    /// `interrupt` is only polled while waiting out the poll interval, so an
    /// attempt already sent to the store is never abandoned half way.
    pub async fn claim_next_or<F: Future>(&self, interrupt: F) -> Result<Post, F::Output> {
        tokio::pin!(interrupt);
        loop {
            if let Some(post) = self.try_claim_once().await {
                return Ok(post);
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                out = &mut interrupt => {
                    debug!("claim wait interrupted");
                    return Err(out);
                }
            }
        }
    }

    /// One claim attempt. `None` covers both "nothing eligible" and store errors.
    pub async fn try_claim_once(&self) -> Option<Post> {
        match self
            .queue
            .try_claim(chrono::Utc::now(), self.config.ttl)
            .await
        {
            Ok(Some(post)) => {
                metrics::claims().add(1, &[KeyValue::new("result", "ok")]);
                debug!(post_id = %post.id, "post leased");
                Some(post)
            }
            Ok(None) => {
                metrics::claims().add(1, &[KeyValue::new("result", "empty")]);
                None
            }
            Err(e) => {
                metrics::claims().add(1, &[KeyValue::new("result", "error")]);
                warn!(error = %e, "claim attempt failed, retrying");
                None
            }
        }
    }
}
