//! Per-post verdict aggregation.
//!
//! A post is positive if any of its photos is. Photos are judged strictly in
//! order and judging stops at the first positive; later photos are never sent.

use crate::dispatch::channel::Channel;
use crate::dispatch::VERDICT_POSITIVE;
use crate::error::ChannelError;
use crate::telemetry::metrics;
use async_trait::async_trait;

/// Produces a verdict for a single photo.
#[async_trait]
pub trait PhotoJudge: Send {
    async fn judge(&mut self, photo_ref: &str) -> Result<bool, ChannelError>;
}

/// Judges photos by asking the remote worker: send the reference, read one reply.
pub struct ChannelJudge<'a, C: ?Sized>(pub &'a mut C);

#[async_trait]
impl<'a, C: Channel + ?Sized> PhotoJudge for ChannelJudge<'a, C> {
    async fn judge(&mut self, photo_ref: &str) -> Result<bool, ChannelError> {
        self.0.send(photo_ref).await?;
        let reply = self.0.recv().await?;
        metrics::photos_judged().add(1, &[]);
        Ok(decode_verdict(&reply))
    }
}

/// A reply is positive only when it is exactly `"1"`.
pub fn decode_verdict(reply: &str) -> bool {
    reply == VERDICT_POSITIVE
}

/// Short-circuit OR over the photos' verdicts.
///
/// A channel failure aborts with `Err`, which is never confused with a
/// negative verdict.
pub async fn any_positive<J>(photos: &[&str], judge: &mut J) -> Result<bool, ChannelError>
where
    J: PhotoJudge + ?Sized,
{
    for photo in photos {
        if judge.judge(photo).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Answers from a fixed script and remembers what it was asked.
    struct ScriptedJudge {
        answers: VecDeque<Result<bool, ChannelError>>,
        asked: Vec<String>,
    }

    impl ScriptedJudge {
        fn new(answers: Vec<Result<bool, ChannelError>>) -> Self {
            Self {
                answers: answers.into(),
                asked: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl PhotoJudge for ScriptedJudge {
        async fn judge(&mut self, photo_ref: &str) -> Result<bool, ChannelError> {
            self.asked.push(photo_ref.to_string());
            self.answers
                .pop_front()
                .unwrap_or(Err(ChannelError::Transport("script exhausted".into())))
        }
    }

    #[tokio::test]
    async fn stops_at_first_positive() {
        let mut judge = ScriptedJudge::new(vec![Ok(false), Ok(true), Ok(false)]);
        let verdict = any_positive(&["p1", "p2", "p3"], &mut judge).await;
        assert_eq!(verdict, Ok(true));
        assert_eq!(judge.asked, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn all_negative_asks_every_photo() {
        let mut judge = ScriptedJudge::new(vec![Ok(false), Ok(false)]);
        let verdict = any_positive(&["p1", "p2"], &mut judge).await;
        assert_eq!(verdict, Ok(false));
        assert_eq!(judge.asked, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn channel_failure_is_not_a_negative_verdict() {
        let mut judge = ScriptedJudge::new(vec![Ok(false), Err(ChannelError::Closed)]);
        let verdict = any_positive(&["p1", "p2", "p3"], &mut judge).await;
        assert_eq!(verdict, Err(ChannelError::Closed));
        assert_eq!(judge.asked, vec!["p1", "p2"]);
    }

    #[test]
    fn only_exact_one_is_positive() {
        assert!(decode_verdict("1"));
        for reply in ["0", "", " 1", "1\n", "true", "yes"] {
            assert!(!decode_verdict(reply), "{reply:?} should be negative");
        }
    }
}
