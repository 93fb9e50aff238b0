use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// Passes only the items of a source for which `predicate` returns `true`.
///
/// Errors are always forwarded and end the stream.
pub struct FilterStream<S, F> {
    source: Option<S>,
    predicate: F,
}

impl<S, F> FilterStream<S, F> {
    /// Creates a new [FilterStream].
    pub fn new(source: S, predicate: F) -> Self {
        Self {
            source: Some(source),
            predicate,
        }
    }
}

impl<S, T, E, F> Stream for FilterStream<S, F>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    F: FnMut(&T) -> bool + Unpin,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        while let Some(source) = this.source.as_mut() {
            match ready!(source.poll_next_unpin(cx)) {
                Some(Ok(item)) => {
                    if (this.predicate)(&item) {
                        return Poll::Ready(Some(Ok(item)));
                    }
                }
                Some(Err(error)) => {
                    this.source = None;
                    return Poll::Ready(Some(Err(error)));
                }
                None => this.source = None,
            }
        }
        Poll::Ready(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, TryStreamExt};
    use std::convert::Infallible;

    #[tokio::test]
    async fn test_keeps_matching_items() {
        let source = stream::iter((1..=10).map(Ok::<_, Infallible>));
        let result: Vec<i32> = FilterStream::new(source, |i: &i32| i % 3 == 0)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(result, [3, 6, 9]);
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let source = stream::iter([Ok(1), Err("upstream"), Ok(2)]);
        let mut stream = FilterStream::new(source, |_: &i32| false);
        assert_eq!(stream.next().await, Some(Err("upstream")));
        assert_eq!(stream.next().await, None);
    }
}
