use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Merges multiple sources by pulling from them in round-robin order.
///
/// Each poll starts at the source after the one that produced the last item, so sources that
/// produce items at the same rate are interleaved. Sources that have ended are removed. The union
/// ends once all sources have ended and is pending if every remaining source is pending. The
/// first error of any source ends the union and drops all sources.
pub struct UnionStream<S> {
    sources: Vec<S>,
    index: usize,
}

impl<S> UnionStream<S> {
    /// Creates a new [UnionStream].
    pub fn new(sources: impl IntoIterator<Item = S>) -> Self {
        Self {
            sources: sources.into_iter().collect(),
            index: 0,
        }
    }
}

impl<S, T, E> Stream for UnionStream<S>
where
    S: Stream<Item = Result<T, E>> + Unpin,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let mut attempts = this.sources.len();
        while attempts > 0 && !this.sources.is_empty() {
            attempts -= 1;
            if this.index >= this.sources.len() {
                this.index = 0;
            }
            match this.sources[this.index].poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(item))) => {
                    this.index = (this.index + 1) % this.sources.len();
                    return Poll::Ready(Some(Ok(item)));
                }
                Poll::Ready(Some(Err(error))) => {
                    this.sources.clear();
                    return Poll::Ready(Some(Err(error)));
                }
                // The next source moves into the current slot.
                Poll::Ready(None) => {
                    this.sources.remove(this.index);
                }
                Poll::Pending => this.index += 1,
            }
        }

        if this.sources.is_empty() {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use futures::stream::{self, BoxStream};
    use futures::{FutureExt, TryStreamExt};
    use std::convert::Infallible;

    fn source(items: &[i32]) -> BoxStream<'static, Result<i32, Infallible>> {
        stream::iter(items.to_vec().into_iter().map(Ok)).boxed()
    }

    #[tokio::test]
    async fn test_no_sources() {
        let sources = Vec::<BoxStream<'static, Result<i32, Infallible>>>::new();
        let result: Vec<i32> = UnionStream::new(sources)
            .try_collect()
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_interleaves_sources() {
        let sources = [source(&[1, 2, 3]), source(&[10, 20, 30, 40, 50])];
        let result: Vec<i32> = UnionStream::new(sources)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(result, [1, 10, 2, 20, 3, 30, 40, 50]);
    }

    #[tokio::test]
    async fn test_skips_empty_sources() {
        let sources = [source(&[]), source(&[1, 2]), source(&[]), source(&[3])];
        let result: Vec<i32> = UnionStream::new(sources)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(result, [1, 3, 2]);
    }

    #[tokio::test]
    async fn test_pending_sources_do_not_block_others() {
        let (first_sender, first) = mpsc::unbounded::<Result<i32, Infallible>>();
        let (second_sender, second) = mpsc::unbounded::<Result<i32, Infallible>>();
        let mut union = UnionStream::new([first, second]);

        assert!(union.next().now_or_never().is_none());

        second_sender.unbounded_send(Ok(2)).unwrap();
        assert_eq!(union.next().now_or_never(), Some(Some(Ok(2))));

        first_sender.unbounded_send(Ok(1)).unwrap();
        drop(second_sender);
        assert_eq!(union.next().now_or_never(), Some(Some(Ok(1))));

        drop(first_sender);
        assert_eq!(union.next().await, None);
    }

    #[tokio::test]
    async fn test_error_ends_union() {
        let failing = stream::iter([Err("upstream")]).boxed();
        let healthy = stream::iter([Ok(1), Ok(2)]).boxed();
        let mut union = UnionStream::new([healthy, failing]);
        assert_eq!(union.next().await, Some(Ok(1)));
        assert_eq!(union.next().await, Some(Err("upstream")));
        assert_eq!(union.next().await, None);
    }
}
