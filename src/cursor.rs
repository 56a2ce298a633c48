//! Cursors: order-aware positions in a [`BiMap`].
//!
//! A cursor points either at an element or at the end position of its order.
//! The end position sits between the largest and the smallest element, so moving
//! forward from the largest element reaches the end, and moving forward again
//! reaches the smallest element. Moving backward works the same way.
//!
//! A cursor is just the id of an element plus the order it walks in.
//! [`Cursor::flip`] keeps the element and changes the order, so it takes `O(1)` time.
//!
//! ```
//! use bitreap::BiMap;
//!
//! let map: BiMap<i32, char> = vec![(1, 'c'), (2, 'b'), (3, 'a')].into_iter().collect();
//! let mut cursor = map.find_left(&2);
//! assert_eq!(cursor.get(), Some(&2));
//! assert_eq!(cursor.flip().get(), Some(&'b'));
//!
//! cursor.move_next();
//! assert_eq!(cursor.flip().get(), Some(&'a'));
//! cursor.move_next();
//! assert!(cursor.is_end());
//! assert_eq!(cursor.flip(), map.end_right());
//! ```

use crate::store::NodeId;
use crate::treap::{self, ByLeft, ByRight, Order};
use crate::{BiMap, Handle};
use std::fmt;
use std::marker::PhantomData;

/// A position in the order `O` of a [`BiMap`].
pub struct Cursor<'a, L, R, O> {
    map: &'a BiMap<L, R>,
    node: Option<NodeId>,
    order: PhantomData<O>,
}

/// A cursor walking in the order of the left values.
pub type LeftCursor<'a, L, R> = Cursor<'a, L, R, ByLeft>;
/// A cursor walking in the order of the right values.
pub type RightCursor<'a, L, R> = Cursor<'a, L, R, ByRight>;

// the derived instances would require `L: Clone, R: Clone, O: Clone`
impl<'a, L, R, O> Clone for Cursor<'a, L, R, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, L, R, O> Copy for Cursor<'a, L, R, O> {}

impl<'a, L, R, O> Cursor<'a, L, R, O> {
    pub(crate) fn new(map: &'a BiMap<L, R>, node: Option<NodeId>) -> Self {
        Cursor {
            map,
            node,
            order: PhantomData,
        }
    }

    /// Returns `true` if the cursor is at the end position.
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// The left value of the current element.
    pub fn left(&self) -> Option<&'a L> {
        let map = self.map;
        Some(&map.store[self.node?].left_value)
    }

    /// The right value of the current element.
    pub fn right(&self) -> Option<&'a R> {
        let map = self.map;
        Some(&map.store[self.node?].right_value)
    }

    /// Both values of the current element.
    pub fn pair(&self) -> Option<(&'a L, &'a R)> {
        let map = self.map;
        let element = &map.store[self.node?];
        Some((&element.left_value, &element.right_value))
    }

    /// A detached handle to the current element, or [`None`] at the end position.
    pub fn handle(&self) -> Option<Handle> {
        Some(self.map.store.handle(self.node?))
    }
}

impl<'a, L, R, O: Order<L, R>> Cursor<'a, L, R, O> {
    /// The value this cursor's order sorts by.
    pub fn get(&self) -> Option<&'a O::Key> {
        let map = self.map;
        Some(O::key(&map.store[self.node?]))
    }

    /// Moves to the next element. From the last element this moves to the end position,
    /// and from the end position to the first element.
    pub fn move_next(&mut self) {
        let map = self.map;
        self.node = match self.node {
            Some(id) => treap::next::<O, L, R>(&map.store, id),
            None => treap::first::<O, L, R>(&map.store, O::root(&map.roots)),
        };
    }

    /// Moves to the previous element. From the first element this moves to the end position,
    /// and from the end position to the last element.
    pub fn move_prev(&mut self) {
        let map = self.map;
        self.node = match self.node {
            Some(id) => treap::prev::<O, L, R>(&map.store, id),
            None => treap::last::<O, L, R>(&map.store, O::root(&map.roots)),
        };
    }

    /// Returns the cursor of the opposite order at the same element.
    /// The end position flips to the end position.
    pub fn flip(&self) -> Cursor<'a, L, R, O::Other> {
        Cursor::new(self.map, self.node)
    }
}

/// Two cursors are equal if they belong to the same map and point at the same position.
impl<'a, L, R, O> PartialEq for Cursor<'a, L, R, O> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.map, other.map) && self.node == other.node
    }
}

impl<'a, L, R, O> Eq for Cursor<'a, L, R, O> {}

impl<'a, L: fmt::Debug, R: fmt::Debug, O> fmt::Debug for Cursor<'a, L, R, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pair() {
            Some(pair) => f.debug_tuple("Cursor").field(&pair).finish(),
            None => f.write_str("Cursor(end)"),
        }
    }
}
