use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Number of chunks each output may buffer ahead of its consumer.
pub const DEFAULT_CAPACITY: usize = 16;

/// One of the two outputs of [`split`].
#[derive(Debug)]
pub struct FanoutStream {
    receiver: mpsc::Receiver<io::Result<Bytes>>,
}

impl Stream for FanoutStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Presents `source` as two streams that each reproduce it exactly, reading the
/// source once.
///
/// A single task copies every chunk into both outputs in turn, so a slow consumer
/// throttles the other one too and memory stays bounded by `capacity` chunks per side.
/// A source error is delivered to both outputs as an [`io::Error`] and ends the copy.
/// An output whose consumer is dropped is detached and the copy continues for the
/// other one; the source is dropped once both are gone or it is exhausted.
pub fn split<S, E>(source: S, capacity: usize) -> (FanoutStream, FanoutStream)
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let (first_sender, first_receiver) = mpsc::channel(capacity);
    let (second_sender, second_receiver) = mpsc::channel(capacity);
    tokio::spawn(copy(Box::pin(source), [Some(first_sender), Some(second_sender)]));
    (
        FanoutStream {
            receiver: first_receiver,
        },
        FanoutStream {
            receiver: second_receiver,
        },
    )
}

type Output = Option<mpsc::Sender<io::Result<Bytes>>>;

async fn copy<S, E>(mut source: Pin<Box<S>>, mut outputs: [Output; 2])
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: Display,
{
    while let Some(item) = source.next().await {
        match item {
            Ok(chunk) if chunk.is_empty() => {}
            Ok(chunk) => {
                for output in &mut outputs {
                    if let Some(sender) = output
                        && sender.send(Ok(chunk.clone())).await.is_err()
                    {
                        debug!("Fan-out consumer went away, detaching it");
                        *output = None;
                    }
                }
                if outputs.iter().all(Option::is_none) {
                    break;
                }
            }
            Err(err) => {
                let message = err.to_string();
                error!("Fan-out source failed: {message}");
                for sender in outputs.iter().flatten() {
                    // A consumer that already left doesn't need the error.
                    let _ = sender.send(Err(io::Error::other(message.clone()))).await;
                }
                break;
            }
        }
    }

    // Release the source before the outputs observe end of stream.
    drop(source);
    drop(outputs);
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::stream;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts items pulled from the wrapped stream and how many times it is dropped.
    struct Counted<S> {
        inner: S,
        pulled: Arc<AtomicUsize>,
        dropped: Arc<AtomicUsize>,
    }

    impl<S: Stream + Unpin> Stream for Counted<S> {
        type Item = S::Item;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            let poll = self.inner.poll_next_unpin(cx);
            if let Poll::Ready(Some(_)) = poll {
                self.pulled.fetch_add(1, Ordering::SeqCst);
            }
            poll
        }
    }

    impl<S> Drop for Counted<S> {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn chunks(count: usize, size: usize) -> Vec<Bytes> {
        (0..count)
            .map(|index| Bytes::from(vec![(index % 251) as u8; size]))
            .collect()
    }

    async fn drain(mut stream: FanoutStream) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(bytes)
    }

    async fn drain_slowly(mut stream: FanoutStream) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            tokio::time::sleep(Duration::from_millis(2)).await;
            bytes.extend_from_slice(&chunk?);
        }
        Ok(bytes)
    }

    #[tokio::test]
    async fn both_outputs_match_source() {
        let source_chunks = chunks(64, 1000);
        let expected: Vec<u8> = source_chunks.concat();
        let pulled = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicUsize::new(0));
        let source = Counted {
            inner: stream::iter(source_chunks.into_iter().map(Ok::<_, io::Error>)),
            pulled: pulled.clone(),
            dropped: dropped.clone(),
        };

        let (first, second) = split(source, 4);
        let (first, second) = tokio::join!(drain(first), drain_slowly(second));
        assert_eq!(first.unwrap(), expected);
        assert_eq!(second.unwrap(), expected);
        assert_eq!(pulled.load(Ordering::SeqCst), 64);
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_source() {
        let (first, second) = split(stream::empty::<Result<Bytes, io::Error>>(), 4);
        let (first, second) = tokio::join!(drain(first), drain(second));
        assert!(first.unwrap().is_empty());
        assert!(second.unwrap().is_empty());
    }

    #[tokio::test]
    async fn errors_reach_both_outputs() {
        let items = vec![Ok(Bytes::from_static(b"partial")), Err("connection reset")];
        let (first, second) = split(stream::iter(items), 4);
        let (first, second) = tokio::join!(drain(first), drain(second));
        assert!(first.unwrap_err().to_string().contains("connection reset"));
        assert!(second.unwrap_err().to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn slow_consumer_throttles_the_other() {
        let source_chunks = chunks(10, 10);
        let expected: Vec<u8> = source_chunks.concat();
        let (mut first, second) = split(stream::iter(source_chunks.into_iter().map(Ok::<_, io::Error>)), 1);

        let mut received = Vec::new();
        let stalled = tokio::time::timeout(Duration::from_millis(200), async {
            while let Some(chunk) = first.next().await {
                received.extend_from_slice(&chunk.unwrap());
            }
        })
        .await;
        assert!(stalled.is_err());
        assert!(received.len() < expected.len());

        // Once the idle consumer leaves, the other one receives the rest.
        drop(second);
        while let Some(chunk) = first.next().await {
            received.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn dropped_consumer_is_detached() {
        let source_chunks = chunks(32, 100);
        let expected: Vec<u8> = source_chunks.concat();
        let (first, second) = split(stream::iter(source_chunks.into_iter().map(Ok::<_, io::Error>)), 2);
        drop(first);
        assert_eq!(drain(second).await.unwrap(), expected);
    }
}
