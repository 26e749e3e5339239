//! Bridge from [`Flux`] into [`futures::Stream`].
//!
//! The bridge subscribes eagerly but requests lazily: demand is granted in
//! batches, and only when the async consumer has drained the previous batch.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::mpsc;

use crate::{
    error::StreamError,
    flux::Flux,
    subscriber::{Subscriber, Subscription},
};

/// Async view of one subscription.
///
/// Yields `Ok` for each element and at most one `Err`, after which the
/// stream ends. Dropping it cancels the subscription.
#[derive(Debug)]
pub struct FluxStream<T> {
    receiver: mpsc::UnboundedReceiver<Result<T, StreamError>>,
    subscription: Subscription,
    batch: u64,
    outstanding: u64,
    done: bool,
}

struct Forward<T> {
    sender: Option<mpsc::UnboundedSender<Result<T, StreamError>>>,
}

impl<T: Send + 'static> Subscriber<T> for Forward<T> {
    fn on_next(&mut self, item: T) {
        if let Some(sender) = &self.sender {
            // The receiver only disappears together with the stream, which
            // cancels on drop.
            let _ = sender.send(Ok(item));
        }
    }

    fn on_error(&mut self, error: StreamError) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(Err(error));
        }
    }

    fn on_complete(&mut self) { self.sender = None; }
}

impl<T: Send + 'static> Flux<T> {
    /// Consume the stream asynchronously, requesting `batch` elements at a
    /// time. A batch of zero is treated as one.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::StreamExt;
    /// use tributary::Flux;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let items: Vec<u32> = Flux::from_sequence([1, 2, 3])
    ///     .into_stream(2)
    ///     .map(|item| item.expect("sequence never fails"))
    ///     .collect()
    ///     .await;
    /// assert_eq!(items, [1, 2, 3]);
    /// # }
    /// ```
    #[must_use]
    pub fn into_stream(self, batch: u64) -> FluxStream<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscription = self.subscribe(Forward {
            sender: Some(sender),
        });
        FluxStream {
            receiver,
            subscription,
            batch: batch.max(1),
            outstanding: 0,
            done: false,
        }
    }
}

impl<T> FluxStream<T> {
    /// Handle to the underlying subscription.
    #[must_use]
    pub fn subscription(&self) -> &Subscription { &self.subscription }
}

impl<T> Stream for FluxStream<T> {
    type Item = Result<T, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.outstanding == 0 {
            this.outstanding = this.batch;
            this.subscription.request(this.batch);
        }
        match this.receiver.poll_recv(cx) {
            Poll::Ready(Some(Ok(item))) => {
                this.outstanding -= 1;
                Poll::Ready(Some(Ok(item)))
            }
            Poll::Ready(Some(Err(error))) => {
                this.done = true;
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for FluxStream<T> {
    fn drop(&mut self) { self.subscription.cancel(); }
}
