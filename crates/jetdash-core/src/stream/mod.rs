// ── Reactive snapshot streams ──
//
// Subscription handles vended by the DataStore.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A subscription to one store slot.
///
/// Provides both point-in-time access and change notification via
/// `changed()` or by converting to a `Stream`.
pub struct SnapshotStream<S: Clone + Send + Sync + 'static> {
    current: S,
    receiver: watch::Receiver<S>,
}

impl<S: Clone + Send + Sync + 'static> SnapshotStream<S> {
    pub(crate) fn new(receiver: watch::Receiver<S>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &S {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> S {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<S> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Wait until `predicate` holds, returning the matching snapshot.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&S) -> bool) -> Option<S> {
        let snap = self.receiver.wait_for(|s| predicate(s)).await.ok()?.clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators. The
    /// first item is the current value.
    pub fn into_stream(self) -> SnapshotWatchStream<S> {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct SnapshotWatchStream<S: Clone + Send + Sync + 'static> {
    inner: WatchStream<S>,
}

impl<S: Clone + Send + Sync + 'static> Stream for SnapshotWatchStream<S> {
    type Item = S;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[tokio::test]
    async fn changed_tracks_latest() {
        let (tx, rx) = watch::channel(1u32);
        let mut stream = SnapshotStream::new(rx);
        assert_eq!(*stream.current(), 1);

        tx.send_replace(2);
        assert_eq!(stream.changed().await, Some(2));
        assert_eq!(*stream.current(), 2);

        drop(tx);
        assert_eq!(stream.changed().await, None);
    }

    #[tokio::test]
    async fn wait_for_skips_until_match() {
        let (tx, rx) = watch::channel(0u32);
        let mut stream = SnapshotStream::new(rx);
        let waiter = tokio::spawn(async move { stream.wait_for(|v| *v >= 3).await });
        for v in 1..=3 {
            tx.send_replace(v);
            tokio::task::yield_now().await;
        }
        assert_eq!(waiter.await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn stream_yields_current_first() {
        let (tx, rx) = watch::channel("a");
        let mut s = SnapshotStream::new(rx).into_stream();
        assert_eq!(s.next().await, Some("a"));
        tx.send_replace("b");
        assert_eq!(s.next().await, Some("b"));
    }
}
