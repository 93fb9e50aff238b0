use futures::{Stream, StreamExt};
use std::cmp::Ordering;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// Defines how many items a [SortStream] buffers before it emits the smallest one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortWindow {
    /// The whole source is buffered. This results in a total order.
    #[default]
    Unbounded,
    /// At most the given number of items is buffered.
    Bounded(NonZeroUsize),
}

impl SortWindow {
    fn is_full(self, len: usize) -> bool {
        match self {
            SortWindow::Unbounded => false,
            SortWindow::Bounded(window) => len >= window.get(),
        }
    }
}

impl From<usize> for SortWindow {
    /// A window of `0` is unbounded.
    fn from(value: usize) -> Self {
        NonZeroUsize::new(value).map_or(SortWindow::Unbounded, SortWindow::Bounded)
    }
}

/// Sorts the items of a source within a sliding window.
///
/// The stream keeps a buffer of up to `window` items that is sorted in descending order. Once the
/// buffer is full, every poll emits the smallest buffered item and makes room for the next source
/// item. After the source has ended, the remaining buffer is emitted in ascending order.
///
/// This is an *approximate* sort for nearly ordered inputs. The output is only totally ordered if
/// the window is [SortWindow::Unbounded] or if no item is displaced by more than `window`
/// positions from its sorted position. Callers that need a total order must use an unbounded
/// window, which materializes the whole source before emitting the first item.
///
/// Equal items are emitted in the order in which they arrived, which allows chaining multiple sort
/// streams to obtain a multi-key order (innermost stream sorts by the least significant key).
pub struct SortStream<S, T, F> {
    source: Option<S>,
    compare: F,
    window: SortWindow,
    /// Sorted in descending order, the next item to emit is the last one.
    sorted: Vec<T>,
}

impl<S, T, F> SortStream<S, T, F> {
    /// Creates a new [SortStream] that orders the items using `compare`.
    pub fn with_comparator(source: S, compare: F, window: SortWindow) -> Self {
        Self {
            source: Some(source),
            compare,
            window,
            sorted: Vec::new(),
        }
    }
}

impl<S, T: Ord> SortStream<S, T, fn(&T, &T) -> Ordering> {
    /// Creates a new [SortStream] that orders the items by their natural order.
    pub fn new(source: S, window: SortWindow) -> Self {
        Self::with_comparator(source, T::cmp, window)
    }
}

impl<S, T, F> SortStream<S, T, F>
where
    F: FnMut(&T, &T) -> Ordering,
{
    fn insert(&mut self, item: T) {
        let compare = &mut self.compare;
        // Items that compare equal stay behind the new item, so they are emitted first.
        let index = self
            .sorted
            .partition_point(|existing| compare(existing, &item) == Ordering::Greater);
        self.sorted.insert(index, item);
    }
}

impl<S, T, E, F> Stream for SortStream<S, T, F>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    T: Unpin,
    F: FnMut(&T, &T) -> Ordering + Unpin,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        while let Some(source) = this.source.as_mut() {
            if this.window.is_full(this.sorted.len()) {
                break;
            }
            match ready!(source.poll_next_unpin(cx)) {
                Some(Ok(item)) => this.insert(item),
                Some(Err(error)) => {
                    this.source = None;
                    this.sorted.clear();
                    return Poll::Ready(Some(Err(error)));
                }
                None => this.source = None,
            }
        }
        Poll::Ready(this.sorted.pop().map(Ok))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.source {
            None => (self.sorted.len(), Some(self.sorted.len())),
            Some(source) => {
                let (min, max) = source.size_hint();
                (
                    min.saturating_add(self.sorted.len()),
                    max.and_then(|max| max.checked_add(self.sorted.len())),
                )
            }
        }
    }
}
