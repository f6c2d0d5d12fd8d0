//! Connection-scoped dispatch: one [`WorkerSession`] per connected worker.
//!
//! Wire protocol, one text message per step:
//!
//! | direction          | payload             |
//! |--------------------|---------------------|
//! | worker → server    | `get`               |
//! | server → worker    | `Invalid request`   |
//! | server → worker    | photo reference     |
//! | worker → server    | `1` / anything else |
//! | server → worker    | `end`               |

pub mod channel;
pub mod session;
pub mod verdict;
pub mod writer;

pub use channel::Channel;
pub use session::{Termination, WorkerSession};
pub use verdict::{ChannelJudge, PhotoJudge, any_positive};
pub use writer::ResultWriter;

/// Worker asks for the next post.
pub const REQUEST_GET: &str = "get";
/// Sent before closing when the worker's request is not `get`.
pub const REPLY_INVALID_REQUEST: &str = "Invalid request";
/// Current post fully processed.
pub const REPLY_END: &str = "end";
/// Positive per-photo verdict from the worker.
pub const VERDICT_POSITIVE: &str = "1";
/// Negative per-photo verdict sent by the reference worker.
pub const VERDICT_NEGATIVE: &str = "0";
