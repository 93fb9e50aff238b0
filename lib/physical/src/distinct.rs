use futures::{Stream, StreamExt};
use rustc_hash::FxHashSet;
use sha1::{Digest, Sha1};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// Removes duplicate items from a source.
///
/// Two items are duplicates if `serialize` produces the same string for both of them. The stream
/// only remembers a SHA-1 fingerprint of each serialization, so memory grows with the number of
/// distinct items but not with their size.
pub struct DistinctStream<S, F> {
    source: Option<S>,
    serialize: F,
    uniques: FxHashSet<String>,
}

impl<S, F> DistinctStream<S, F> {
    /// Creates a new [DistinctStream].
    pub fn new(source: S, serialize: F) -> Self {
        Self {
            source: Some(source),
            serialize,
            uniques: FxHashSet::default(),
        }
    }
}

fn fingerprint(value: &str) -> String {
    hex::encode(Sha1::new().chain_update(value).finalize())
}

impl<S, T, E, F> Stream for DistinctStream<S, F>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    F: FnMut(&T) -> String + Unpin,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        while let Some(source) = this.source.as_mut() {
            match ready!(source.poll_next_unpin(cx)) {
                Some(Ok(item)) => {
                    let key = fingerprint(&(this.serialize)(&item));
                    if this.uniques.insert(key) {
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
