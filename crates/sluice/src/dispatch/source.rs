use core::{future::Future, pin::Pin};

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::sequence::MAX_BATCH_PREALLOC;

/// Strategy for producing the next job to dispatch.
///
/// Resolves to `None` when the source is exhausted or `token` is cancelled
/// while waiting on it.
pub(crate) trait JobSource<J>: Send {
    fn next_job(&mut self, token: &CancellationToken) -> impl Future<Output = Option<J>> + Send;
}

/// Jobs that were fully materialized before dispatch started.
pub(crate) struct Materialized<J> {
    jobs: std::vec::IntoIter<J>,
}

impl<J> Materialized<J> {
    pub(crate) fn new(jobs: Vec<J>) -> Self {
        Self {
            jobs: jobs.into_iter(),
        }
    }
}

impl<J: Send> JobSource<J> for Materialized<J> {
    fn next_job(
        &mut self,
        _token: &CancellationToken,
    ) -> impl Future<Output = Option<J>> + Send {
        core::future::ready(self.jobs.next())
    }
}

/// Accumulates items from an open-ended stream into batches.
///
/// A batch is handed out the moment it reaches `batch_size`, without pulling
/// anything further from the stream. When the stream ends, a non-empty
/// partial batch is handed out once and the source is then exhausted.
pub(crate) struct StreamBatches<St> {
    stream: Pin<Box<St>>,
    batch_size: usize,
    closed: bool,
}

impl<St: Stream> StreamBatches<St> {
    pub(crate) fn new(stream: St, batch_size: usize) -> Self {
        Self {
            stream: Box::pin(stream),
            batch_size,
            closed: false,
        }
    }
}

impl<St> JobSource<Vec<St::Item>> for StreamBatches<St>
where
    St: Stream + Send,
    St::Item: Send,
{
    fn next_job(
        &mut self,
        token: &CancellationToken,
    ) -> impl Future<Output = Option<Vec<St::Item>>> + Send {
        async move {
            if self.closed {
                return None;
            }

            let mut batch = Vec::with_capacity(self.batch_size.min(MAX_BATCH_PREALLOC));
            loop {
                let next = tokio::select! {
                    biased;
                    () = token.cancelled() => return None,
                    next = self.stream.next() => next,
                };

                match next {
                    Some(item) => {
                        batch.push(item);
                        if batch.len() == self.batch_size {
                            return Some(batch);
                        }
                    }
                    None => {
                        self.closed = true;
                        return (!batch.is_empty()).then_some(batch);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    #[tokio::test]
    async fn materialized_yields_in_order() {
        let token = CancellationToken::new();
        let mut source = Materialized::new(vec![1, 2]);
        assert_eq!(source.next_job(&token).await, Some(1));
        assert_eq!(source.next_job(&token).await, Some(2));
        assert_eq!(source.next_job(&token).await, None);
    }

    #[tokio::test]
    async fn stream_batches_fill_then_flush_partial() {
        let token = CancellationToken::new();
        let mut source = StreamBatches::new(stream::iter(1..=7), 3);
        assert_eq!(source.next_job(&token).await, Some(vec![1, 2, 3]));
        assert_eq!(source.next_job(&token).await, Some(vec![4, 5, 6]));
        assert_eq!(source.next_job(&token).await, Some(vec![7]));
        assert_eq!(source.next_job(&token).await, None);
        assert_eq!(source.next_job(&token).await, None);
    }

    #[tokio::test]
    async fn huge_batch_size_flushes_at_stream_end() {
        let token = CancellationToken::new();
        let mut source = StreamBatches::new(stream::iter(1..=3), usize::MAX);
        assert_eq!(source.next_job(&token).await, Some(vec![1, 2, 3]));
        assert_eq!(source.next_job(&token).await, None);
    }

    #[tokio::test]
    async fn empty_stream_yields_no_batch() {
        let token = CancellationToken::new();
        let mut source = StreamBatches::new(stream::empty::<u8>(), 3);
        assert_eq!(source.next_job(&token).await, None);
    }

    #[tokio::test]
    async fn full_batch_is_returned_without_waiting_for_more() {
        let token = CancellationToken::new();
        // Two items, then a stream that never yields again.
        let items = stream::iter([1, 2]).chain(stream::pending());
        let mut source = StreamBatches::new(items, 2);
        assert_eq!(source.next_job(&token).await, Some(vec![1, 2]));

        token.cancel();
        assert_eq!(source.next_job(&token).await, None);
    }
}
