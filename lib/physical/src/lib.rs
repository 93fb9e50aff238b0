#![doc(test(attr(deny(warnings))))]

//! Contains the streaming operators of the LDF client.
//!
//! Every operator is a [`futures::Stream`] over `Result<T, E>` that owns its sources. The operators
//! are lazy: they only poll their sources when they are polled themselves, and they never block.
//!
//! - An upstream error is forwarded unchanged. Afterward, the operator drops its sources and ends.
//! - Dropping an operator drops its sources, which stops any work that is still pending upstream.
//! - Once an operator has returned `Poll::Ready(None)`, it keeps doing so.

mod branch;
mod distinct;
mod filter;
mod slice;
mod sort;
mod union;

pub use branch::{branch, BranchStream};
pub use distinct::DistinctStream;
pub use filter::FilterStream;
pub use slice::SliceStream;
pub use sort::{SortStream, SortWindow};
pub use union::UnionStream;
