use crate::source::BindingStream;
use crate::sparql::error::QueryEvaluationError;
use futures::stream::BoxStream;
use futures::{stream, Stream, StreamExt};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tracing::debug;

/// A stream that yields the single boolean result of an ASK query.
pub struct QueryBooleanStream {
    inner: BoxStream<'static, Result<bool, QueryEvaluationError>>,
}

impl QueryBooleanStream {
    pub fn new(
        inner: impl Stream<Item = Result<bool, QueryEvaluationError>> + Send + 'static,
    ) -> Self {
        Self {
            inner: inner.boxed(),
        }
    }

    /// Answers whether `bindings` yields at least one binding.
    pub(crate) fn ask(bindings: BindingStream) -> Self {
        Self::new(AskProjection {
            source: Some(bindings),
            done: false,
        })
    }

    /// Waits for the result.
    pub async fn value(mut self) -> Result<bool, QueryEvaluationError> {
        self.inner.next().await.unwrap_or_else(|| {
            Err(QueryEvaluationError::InternalError(
                "The boolean result stream ended without a value".to_owned(),
            ))
        })
    }
}

impl From<bool> for QueryBooleanStream {
    fn from(value: bool) -> Self {
        Self::new(stream::once(async move { Ok(value) }))
    }
}

impl Stream for QueryBooleanStream {
    type Item = Result<bool, QueryEvaluationError>;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Yields `true` as soon as the source yields a binding and `false` if it ends without one.
///
/// The source is dropped once the answer is known.
struct AskProjection {
    source: Option<BindingStream>,
    done: bool,
}

impl Stream for AskProjection {
    type Item = Result<bool, QueryEvaluationError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        let Some(source) = this.source.as_mut() else {
            return Poll::Ready(None);
        };
        let result = match ready!(source.poll_next_unpin(cx)) {
            Some(Ok(binding)) => {
                debug!(%binding, "Found a binding, the ASK query is true");
                Ok(true)
            }
            Some(Err(error)) => Err(error),
            None => Ok(false),
        };
        this.source = None;
        this.done = true;
        Poll::Ready(Some(result))
    }
}
