//! Result writer: persists the final verdict for a post.

use crate::error::Result;
use crate::model::post::PostId;
use crate::queue::WorkQueue;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use std::sync::Arc;

#[derive(Clone)]
pub struct ResultWriter {
    queue: Arc<dyn WorkQueue>,
}

impl ResultWriter {
    pub fn new(queue: Arc<dyn WorkQueue>) -> Self {
        Self { queue }
    }

    /// Write `verdict` for `id`. Repeating the call with the same verdict is a no-op.
    pub async fn set_result(&self, id: PostId, verdict: bool) -> Result<()> {
        let result = self.queue.set_result(id, verdict).await;
        metrics::result_writes().add(
            1,
            &[KeyValue::new(
                "result",
                if result.is_ok() { "ok" } else { "error" },
            )],
        );
        result
    }
}
