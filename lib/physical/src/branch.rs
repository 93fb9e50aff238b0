use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

/// Splits `source` into `count` independent streams that each produce every item of `source`.
///
/// Items are pulled from `source` on demand by whichever branch is furthest ahead and are
/// buffered until every live branch has consumed them. Dropping a branch releases its claim on
/// the buffer. Once every branch has been dropped, `source` itself is dropped.
///
/// Errors are not replayed: an error is delivered to the branch that pulled it, after which the
/// source is dropped and the remaining branches end once they have drained the buffer.
pub fn branch<S, T, E>(source: S, count: usize) -> Vec<BranchStream<S, T>>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    T: Clone,
{
    let state = Arc::new(Mutex::new(BranchState {
        source: (count > 0).then_some(source),
        buffer: VecDeque::new(),
        offset: 0,
        positions: vec![Some(0); count],
        wakers: vec![None; count],
    }));
    (0..count)
        .map(|index| BranchStream {
            index,
            state: Arc::clone(&state),
        })
        .collect()
}

/// One of the streams created by [branch].
pub struct BranchStream<S, T> {
    index: usize,
    state: Arc<Mutex<BranchState<S, T>>>,
}

struct BranchState<S, T> {
    source: Option<S>,
    buffer: VecDeque<T>,
    /// The absolute position of the first buffered item.
    offset: usize,
    /// The absolute position of the next item for each branch. [None] once a branch is dropped.
    positions: Vec<Option<usize>>,
    wakers: Vec<Option<Waker>>,
}

impl<S, T> BranchState<S, T> {
    /// Drops all buffered items that every live branch has already consumed.
    fn release(&mut self) {
        let Some(min) = self.positions.iter().flatten().min().copied() else {
            self.source = None;
            self.buffer.clear();
            return;
        };
        while self.offset < min && self.buffer.pop_front().is_some() {
            self.offset += 1;
        }
    }

    fn take_other_wakers(&mut self, index: usize) -> Vec<Waker> {
        self.wakers
            .iter_mut()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .filter_map(|(_, waker)| waker.take())
            .collect()
    }
}

impl<S, T> BranchStream<S, T> {
    fn lock(&self) -> MutexGuard<'_, BranchState<S, T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S, T, E> Stream for BranchStream<S, T>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    T: Clone,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let index = self.index;
        let (result, wakers) = {
            let mut state = self.lock();
            let Some(position) = state.positions[index] else {
                return Poll::Ready(None);
            };

            if let Some(item) = state.buffer.get(position - state.offset).cloned() {
                state.positions[index] = Some(position + 1);
                state.release();
                return Poll::Ready(Some(Ok(item)));
            }

            let Some(source) = state.source.as_mut() else {
                return Poll::Ready(None);
            };
            match source.poll_next_unpin(cx) {
                Poll::Pending => {
                    state.wakers[index] = Some(cx.waker().clone());
                    return Poll::Pending;
                }
                Poll::Ready(Some(Ok(item))) => {
                    state.buffer.push_back(item.clone());
                    state.positions[index] = Some(position + 1);
                    state.release();
                    (Some(Ok(item)), state.take_other_wakers(index))
                }
                Poll::Ready(Some(Err(error))) => {
                    state.source = None;
                    (Some(Err(error)), state.take_other_wakers(index))
                }
                Poll::Ready(None) => {
                    state.source = None;
                    (None, state.take_other_wakers(index))
                }
            }
        };
        wakers.into_iter().for_each(Waker::wake);
        Poll::Ready(result)
    }
}

impl<S, T> Drop for BranchStream<S, T> {
    fn drop(&mut self) {
        let index = self.index;
        let wakers = {
            let mut state = self.lock();
            state.positions[index] = None;
            state.wakers[index] = None;
            state.release();
            state.take_other_wakers(index)
        };
        wakers.into_iter().for_each(Waker::wake);
    }
}
