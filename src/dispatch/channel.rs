//! Bidirectional message channel between the dispatcher and one worker.

use crate::error::ChannelError;
use async_trait::async_trait;

/// One logical text message per call in each direction.
#[async_trait]
pub trait Channel: Send {
    /// Wait for the next message from the worker.
    async fn recv(&mut self) -> Result<String, ChannelError>;

    /// Send one message to the worker.
    async fn send(&mut self, payload: &str) -> Result<(), ChannelError>;

    /// Release the channel once the session is over. Errors are ignored.
    async fn close(&mut self) {}
}
