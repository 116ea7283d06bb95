//! Event: a handle for an in-flight asynchronous send/receive

use tokio::sync::oneshot;

use crate::error::{OverlayError, Result};
use crate::vaddr::{Tag, VAddr};

/// What an [`Event`] resolves to once the underlying operation completes.
///
/// `source`/`tag` are only populated for events obtained from an
/// any-source/any-tag receive; they are `None` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventOutcome {
    pub source: Option<VAddr>,
    pub tag: Option<Tag>,
}

/// An opaque handle for an in-flight asynchronous send or receive.
///
/// Single-use: `wait()` consumes the event. Cancellation is not supported
/// intrinsically; a substrate may offer a best-effort cancel on top but the
/// contract does not require one.
pub struct Event {
    rx: oneshot::Receiver<Result<EventOutcome>>,
}

impl Event {
    /// Build an event backed by a completion channel. Communication-policy
    /// implementations construct these; callers only consume them.
    pub fn new(rx: oneshot::Receiver<Result<EventOutcome>>) -> Self {
        Self { rx }
    }

    /// Block (asynchronously) until the underlying operation completes.
    pub async fn wait(self) -> Result<EventOutcome> {
        self.rx
            .await
            .map_err(|_| OverlayError::SubstrateFailure("event sender dropped".into()))?
    }
}

/// Paired sender half, handed to the policy implementation that completes
/// the operation.
pub type EventSender = oneshot::Sender<Result<EventOutcome>>;

/// Construct a fresh event/sender pair.
pub fn event_pair() -> (Event, EventSender) {
    let (tx, rx) = oneshot::channel();
    (Event::new(rx), tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_resolves_with_outcome() {
        let (event, tx) = event_pair();
        tx.send(Ok(EventOutcome {
            source: Some(VAddr::new(2)),
            tag: Some(Tag::new(7)),
        }))
        .unwrap();

        let outcome = event.wait().await.unwrap();
        assert_eq!(outcome.source, Some(VAddr::new(2)));
        assert_eq!(outcome.tag, Some(Tag::new(7)));
    }

    #[tokio::test]
    async fn dropped_sender_surfaces_substrate_failure() {
        let (event, tx) = event_pair();
        drop(tx);
        let err = event.wait().await.unwrap_err();
        assert!(matches!(err, OverlayError::SubstrateFailure(_)));
    }
}
