use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// Skips the first `offset` items of a source and then emits at most `limit` items.
///
/// The source is dropped as soon as the limit is reached, which cancels all upstream work.
pub struct SliceStream<S> {
    source: Option<S>,
    offset: usize,
    remaining: Option<usize>,
}

impl<S> SliceStream<S> {
    /// Creates a new [SliceStream]. A `limit` of [None] emits all items after the offset.
    pub fn new(source: S, offset: usize, limit: Option<usize>) -> Self {
        Self {
            source: (limit != Some(0)).then_some(source),
            offset,
            remaining: limit,
        }
    }
}

impl<S, T, E> Stream for SliceStream<S>
where
    S: Stream<Item = Result<T, E>> + Unpin,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        while let Some(source) = this.source.as_mut() {
            match ready!(source.poll_next_unpin(cx)) {
                Some(Ok(item)) => {
                    if this.offset > 0 {
                        this.offset -= 1;
                        continue;
                    }
                    if let Some(remaining) = this.remaining.as_mut() {
                        *remaining -= 1;
                        if *remaining == 0 {
                            this.source = None;
                        }
                    }
                    return Poll::Ready(Some(Ok(item)));
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
