//! Worker session: the per-connection dispatch state machine.
//!
//! ```text
//! AwaitRequest ──get──▶ HasItem ──claim──▶ SendingPhotos ──verdict──▶ Reporting ──end──▶ AwaitRequest
//!       │                                        │                         │
//!       └──────────── any failure ───────────────┴────────▶ terminated ◀───┘
//! ```
//!
//! A session never un-leases the post it holds. If it dies mid-post the
//! lease simply runs out and another session picks the post up.

use crate::dispatch::channel::Channel;
use crate::dispatch::verdict::{ChannelJudge, any_positive};
use crate::dispatch::writer::ResultWriter;
use crate::dispatch::{REPLY_END, REPLY_INVALID_REQUEST, REQUEST_GET};
use crate::error::ChannelError;
use crate::lease::{LeaseConfig, LeaseManager};
use crate::model::post::{Post, PostId};
use crate::queue::WorkQueue;
use crate::telemetry::dispatch::{record_verdict, start_post_span, start_session_span};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, Span, debug, error, info, warn};
use uuid::Uuid;

/// Why a session ended. Every session ends with exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Reading the next request failed, including an orderly close.
    Disconnected(ChannelError),
    /// The worker sent something other than `get`, or spoke while waiting for work.
    InvalidRequest { payload: String },
    /// The photo exchange broke down. The post stays leased until TTL expiry.
    ExchangeFailed { post_id: PostId, error: ChannelError },
    /// The verdict was written but `end` could not be delivered.
    ReportFailed { post_id: PostId, error: ChannelError },
}

impl Termination {
    /// Short label for metrics.
    pub fn cause(&self) -> &'static str {
        match self {
            Termination::Disconnected(_) => "disconnected",
            Termination::InvalidRequest { .. } => "invalid_request",
            Termination::ExchangeFailed { .. } => "exchange_failed",
            Termination::ReportFailed { .. } => "report_failed",
        }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Disconnected(e) => write!(f, "worker disconnected: {e}"),
            Termination::InvalidRequest { payload } => {
                write!(f, "invalid request {payload:?}")
            }
            Termination::ExchangeFailed { post_id, error } => {
                write!(f, "photo exchange for post {post_id} failed: {error}")
            }
            Termination::ReportFailed { post_id, error } => {
                write!(f, "could not report post {post_id}: {error}")
            }
        }
    }
}

/// A post held by the session, plus its tracing context.
struct InFlight {
    post: Post,
    span: Span,
    claimed_at: Instant,
}

enum SessionState {
    AwaitRequest,
    HasItem,
    SendingPhotos(InFlight),
    Reporting { flight: InFlight, verdict: bool },
}

/// Drives one connected worker through claim, delegate, aggregate, report.
pub struct WorkerSession<C> {
    id: Uuid,
    channel: C,
    leases: LeaseManager,
    writer: ResultWriter,
}

impl<C: Channel> WorkerSession<C> {
    /// The queue handle is shared with every other session; nothing else is.
    pub fn new(channel: C, queue: Arc<dyn WorkQueue>, lease: LeaseConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            leases: LeaseManager::new(Arc::clone(&queue), lease),
            writer: ResultWriter::new(queue),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run until the worker goes away or breaks protocol.
    pub async fn run(mut self) -> Termination {
        let span = start_session_span(&self.id);
        async {
            info!("worker session started");
            let mut state = SessionState::AwaitRequest;
            let termination = loop {
                state = match self.step(state).await {
                    Ok(next) => next,
                    Err(termination) => break termination,
                };
            };
            self.channel.close().await;

            metrics::sessions_terminated()
                .add(1, &[KeyValue::new("cause", termination.cause())]);
            match &termination {
                Termination::Disconnected(_) => info!(cause = %termination, "worker session ended"),
                _ => warn!(cause = %termination, "worker session terminated"),
            }
            termination
        }
        .instrument(span)
        .await
    }

    async fn step(&mut self, state: SessionState) -> Result<SessionState, Termination> {
        match state {
            SessionState::AwaitRequest => {
                let request = self
                    .channel
                    .recv()
                    .await
                    .map_err(Termination::Disconnected)?;
                if request != REQUEST_GET {
                    return Err(self.reject(request).await);
                }
                Ok(SessionState::HasItem)
            }

            // The worker must stay silent until it hears from us. Watching the
            // channel while waiting keeps a departed worker from leasing a post.
            SessionState::HasItem => {
                let claimed = self.leases.claim_next_or(self.channel.recv()).await;
                let post = match claimed {
                    Ok(post) => post,
                    Err(Err(e)) => return Err(Termination::Disconnected(e)),
                    Err(Ok(payload)) => return Err(self.reject(payload).await),
                };
                let photos = post.photos().len();
                let span = start_post_span(&post.id, photos);
                span.in_scope(|| info!(photos, "post claimed"));
                Ok(SessionState::SendingPhotos(InFlight {
                    post,
                    span,
                    claimed_at: Instant::now(),
                }))
            }

            SessionState::SendingPhotos(flight) => {
                let verdict = {
                    let photos = flight.post.photos();
                    if photos.is_empty() {
                        false
                    } else {
                        any_positive(&photos, &mut ChannelJudge(&mut self.channel))
                            .instrument(flight.span.clone())
                            .await
                            .map_err(|error| Termination::ExchangeFailed {
                                post_id: flight.post.id,
                                error,
                            })?
                    }
                };
                Ok(SessionState::Reporting { flight, verdict })
            }

            SessionState::Reporting { flight, verdict } => {
                let post_id = flight.post.id;
                record_verdict(&flight.span, verdict);

                // Best effort: a failed write leaves the post to be reclaimed.
                if let Err(e) = self.writer.set_result(post_id, verdict).await {
                    flight
                        .span
                        .in_scope(|| error!(error = %e, "failed to persist verdict"));
                }

                self.channel
                    .send(REPLY_END)
                    .await
                    .map_err(|error| Termination::ReportFailed { post_id, error })?;

                let elapsed_ms = flight.claimed_at.elapsed().as_secs_f64() * 1000.0;
                metrics::verdicts().add(1, &[KeyValue::new("verdict", verdict)]);
                metrics::post_duration_ms().record(elapsed_ms, &[]);
                flight
                    .span
                    .in_scope(|| info!(verdict, duration_ms = elapsed_ms, "post reported"));
                Ok(SessionState::AwaitRequest)
            }
        }
    }

    /// Answer a protocol violation. The notice is best effort.
    async fn reject(&mut self, payload: String) -> Termination {
        if let Err(e) = self.channel.send(REPLY_INVALID_REQUEST).await {
            debug!(error = %e, "could not deliver invalid-request notice");
        }
        Termination::InvalidRequest { payload }
    }
}
