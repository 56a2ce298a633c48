//! A bidirectional one-to-one map.
//!
//! A [`BiMap`] keeps its pairs in a single element store, indexed by two treaps:
//! one ordered by the left values and one ordered by the right values. Every element
//! draws one random priority when it is inserted, and both trees are balanced by that
//! same priority.
//!
//! Positions are represented by [`Cursor`]s, which walk in one of the two orders and
//! can be [flipped](Cursor::flip) to the other order in `O(1)`. A cursor borrows the
//! map; to keep a reference to an element across mutations, take its [`Handle`].
//!
//! Allocating operations are strongly exception safe: if an insertion or a copy fails,
//! the map is left exactly as it was. Everything that can fail is done before the trees
//! are modified.

pub mod cursor;
pub mod error;
pub mod iterators;

mod bimap;
mod store;
mod treap;

#[cfg(any(test, feature = "fault-injection"))]
pub mod fault;

#[cfg(test)]
mod exception_safety;

pub use bimap::BiMap;
pub use cursor::{Cursor, LeftCursor, RightCursor};
pub use error::{Error, Result};
pub use store::Handle;
pub use treap::{ByLeft, ByRight, Order};
