//! Shared test doubles: in-process worker channels and a flaky queue.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use photo_dispatch::dispatch::{Channel, REPLY_END, REPLY_INVALID_REQUEST};
use photo_dispatch::error::{ChannelError, Error, Result};
use photo_dispatch::lease::LeaseConfig;
use photo_dispatch::model::post::{Post, PostId};
use photo_dispatch::queue::{MemoryQueue, WorkQueue};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Lease timing for tests: long TTL, fast polling.
pub fn fast_lease() -> LeaseConfig {
    LeaseConfig {
        ttl: Duration::from_secs(3600),
        poll_interval: Duration::from_millis(10),
    }
}

/// Everything the dispatcher sent to a fake worker, in order.
#[derive(Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<String>>>);

impl SentLog {
    pub fn push(&self, payload: &str) {
        self.0.lock().unwrap().push(payload.to_string());
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, payload: &str) -> bool {
        self.0.lock().unwrap().iter().any(|m| m == payload)
    }
}

/// A worker that asks for `gets` posts and answers photos from a verdict table.
///
/// Unknown photos are negative. Between `get` and the next photo or `end`
/// it stays silent, like a real worker. When out of requests it disconnects,
/// or hangs forever if `stall_on_photo` is set and a photo is outstanding.
pub struct FakeWorker {
    verdicts: HashMap<String, bool>,
    gets_left: usize,
    awaiting_reply: bool,
    pending_photo: Option<String>,
    stall_on_photo: bool,
    pub sent: SentLog,
}

impl FakeWorker {
    pub fn new(gets: usize) -> Self {
        Self {
            verdicts: HashMap::new(),
            gets_left: gets,
            awaiting_reply: false,
            pending_photo: None,
            stall_on_photo: false,
            sent: SentLog::default(),
        }
    }

    pub fn positive(mut self, photo_ref: &str) -> Self {
        self.verdicts.insert(photo_ref.to_string(), true);
        self
    }

    /// Never answer a photo: models a worker that hangs mid-post.
    pub fn stalling(mut self) -> Self {
        self.stall_on_photo = true;
        self
    }
}

#[async_trait]
impl Channel for FakeWorker {
    async fn recv(&mut self) -> std::result::Result<String, ChannelError> {
        if let Some(photo) = self.pending_photo.take() {
            if self.stall_on_photo {
                std::future::pending::<()>().await;
            }
            let positive = self.verdicts.get(&photo).copied().unwrap_or(false);
            return Ok(if positive { "1" } else { "0" }.to_string());
        }
        if self.awaiting_reply {
            std::future::pending::<()>().await;
        }
        if self.gets_left > 0 {
            self.gets_left -= 1;
            self.awaiting_reply = true;
            return Ok("get".to_string());
        }
        Err(ChannelError::Closed)
    }

    async fn send(&mut self, payload: &str) -> std::result::Result<(), ChannelError> {
        self.sent.push(payload);
        if payload == REPLY_END || payload == REPLY_INVALID_REQUEST {
            self.awaiting_reply = false;
        } else {
            self.pending_photo = Some(payload.to_string());
        }
        Ok(())
    }
}

/// Replays a fixed list of incoming messages, then reports `Closed`.
pub struct ScriptedChannel {
    incoming: VecDeque<String>,
    fail_send_of: Option<String>,
    pub sent: SentLog,
}

impl ScriptedChannel {
    pub fn new(incoming: &[&str]) -> Self {
        Self {
            incoming: incoming.iter().map(|s| s.to_string()).collect(),
            fail_send_of: None,
            sent: SentLog::default(),
        }
    }

    /// Make sending this exact payload fail.
    pub fn failing_send_of(mut self, payload: &str) -> Self {
        self.fail_send_of = Some(payload.to_string());
        self
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn recv(&mut self) -> std::result::Result<String, ChannelError> {
        self.incoming.pop_front().ok_or(ChannelError::Closed)
    }

    async fn send(&mut self, payload: &str) -> std::result::Result<(), ChannelError> {
        if self.fail_send_of.as_deref() == Some(payload) {
            return Err(ChannelError::Transport("broken pipe".to_string()));
        }
        self.sent.push(payload);
        Ok(())
    }
}

/// Wraps a `MemoryQueue`, failing the first `claim_failures` claims and,
/// optionally, every verdict write.
pub struct FlakyQueue {
    pub inner: MemoryQueue,
    claim_failures: AtomicUsize,
    fail_writes: bool,
    pub claim_calls: AtomicUsize,
}

impl FlakyQueue {
    pub fn new(claim_failures: usize, fail_writes: bool) -> Self {
        Self {
            inner: MemoryQueue::new(),
            claim_failures: AtomicUsize::new(claim_failures),
            fail_writes,
            claim_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WorkQueue for FlakyQueue {
    async fn try_claim(&self, now: DateTime<Utc>, ttl: Duration) -> Result<Option<Post>> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.claim_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.claim_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Other("store unavailable".to_string()));
        }
        self.inner.try_claim(now, ttl).await
    }

    async fn set_result(&self, id: PostId, verdict: bool) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Other("write rejected".to_string()));
        }
        self.inner.set_result(id, verdict).await
    }
}
