//! Reference remote worker.
//!
//! Connects to the dispatcher, pulls posts with `get`, and answers each photo
//! reference by running a local classifier command. The classifier receives
//! the reference in `PHOTO_REF` and prints `1` for a positive photo.

use crate::dispatch::{
    REPLY_END, REPLY_INVALID_REQUEST, REQUEST_GET, VERDICT_NEGATIVE, VERDICT_POSITIVE,
};
use crate::error::{ChannelError, Error, Result};
use futures::{SinkExt, StreamExt};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// How the worker reaches the dispatcher and classifies photos.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Dispatcher WebSocket URL, e.g. `ws://localhost:8080/ws`.
    pub url: String,
    /// Classifier executable.
    pub classifier: PathBuf,
    /// Extra arguments passed to the classifier before it runs.
    pub classifier_args: Vec<String>,
    /// Delay before reconnecting after a session ends.
    pub reconnect_delay: Duration,
}

/// Run forever, reconnecting with a fixed delay whenever the session drops.
pub async fn run(config: &WorkerConfig) {
    loop {
        info!(url = %config.url, "connecting to dispatcher");
        match run_once(config).await {
            Ok(()) => warn!("dispatcher closed the session, reconnecting"),
            Err(e) => error!(error = %e, "worker session failed"),
        }
        tokio::time::sleep(config.reconnect_delay).await;
    }
}

/// One connection: pull and classify until the dispatcher goes away.
pub async fn run_once(config: &WorkerConfig) -> Result<()> {
    let (mut ws, _response) = connect_async(config.url.as_str())
        .await
        .map_err(|e| ChannelError::Transport(e.to_string()))?;
    info!("connected to dispatcher");

    let mut posts: u64 = 0;
    loop {
        ws.send(Message::Text(REQUEST_GET.into()))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        // Photo references until `end`.
        loop {
            let payload = match ws.next().await {
                Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                Some(Ok(Message::Binary(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(_))) | None => {
                    info!(posts, "dispatcher closed connection");
                    return Ok(());
                }
                Some(Err(e)) => return Err(ChannelError::Transport(e.to_string()).into()),
            };

            if payload == REPLY_END {
                posts += 1;
                debug!(posts, "post finished");
                break;
            }
            if payload == REPLY_INVALID_REQUEST {
                return Err(Error::Other("dispatcher rejected request".to_string()));
            }

            let positive = classify(config, &payload).await;
            let reply = if positive {
                VERDICT_POSITIVE
            } else {
                VERDICT_NEGATIVE
            };
            ws.send(Message::Text(reply.into()))
                .await
                .map_err(|e| ChannelError::Transport(e.to_string()))?;
        }
    }
}

/// Run the classifier on one photo reference.
///
/// Any classifier failure counts as a negative verdict.
pub async fn classify(config: &WorkerConfig, photo_ref: &str) -> bool {
    let output = Command::new(&config.classifier)
        .args(&config.classifier_args)
        .env("PHOTO_REF", photo_ref)
        .kill_on_drop(true)
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {
            let positive = String::from_utf8_lossy(&output.stdout).trim() == VERDICT_POSITIVE;
            debug!(photo_ref, positive, "photo classified");
            positive
        }
        Ok(output) => {
            warn!(
                photo_ref,
                status = output.status.code().unwrap_or(-1),
                "classifier exited with failure"
            );
            false
        }
        Err(e) => {
            warn!(photo_ref, error = %e, "classifier could not be started");
            false
        }
    }
}
