//! Iterators over a [`BiMap`].

use crate::store::NodeId;
use crate::treap::{self, Order};
use crate::BiMap;
use std::iter::FusedIterator;
use std::marker::PhantomData;

/// Iterates over the pairs of a map, in the order `O`.
///
/// This struct is created by [`BiMap::iter_left`] and [`BiMap::iter_right`].
pub struct Iter<'a, L, R, O> {
    map: &'a BiMap<L, R>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
    order: PhantomData<O>,
}

impl<'a, L, R, O: Order<L, R>> Iter<'a, L, R, O> {
    pub(crate) fn new(map: &'a BiMap<L, R>) -> Self {
        let root = O::root(&map.roots);
        Iter {
            map,
            front: treap::first::<O, L, R>(&map.store, root),
            back: treap::last::<O, L, R>(&map.store, root),
            remaining: map.len(),
            order: PhantomData,
        }
    }
}

impl<'a, L, R, O> Clone for Iter<'a, L, R, O> {
    fn clone(&self) -> Self {
        Iter {
            map: self.map,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
            order: PhantomData,
        }
    }
}

impl<'a, L, R, O: Order<L, R>> Iterator for Iter<'a, L, R, O> {
    type Item = (&'a L, &'a R);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let map = self.map;
        let id = self.front?;
        self.front = treap::next::<O, L, R>(&map.store, id);
        self.remaining -= 1;
        let element = &map.store[id];
        Some((&element.left_value, &element.right_value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, L, R, O: Order<L, R>> DoubleEndedIterator for Iter<'a, L, R, O> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let map = self.map;
        let id = self.back?;
        self.back = treap::prev::<O, L, R>(&map.store, id);
        self.remaining -= 1;
        let element = &map.store[id];
        Some((&element.left_value, &element.right_value))
    }
}

impl<'a, L, R, O: Order<L, R>> ExactSizeIterator for Iter<'a, L, R, O> {}

impl<'a, L, R, O: Order<L, R>> FusedIterator for Iter<'a, L, R, O> {}

/// An owning iterator over the pairs of a map, in the order of the left values.
///
/// This struct is created by the [`IntoIterator`] implementation of [`BiMap`].
pub struct IntoIter<L, R> {
    pub(crate) inner: std::vec::IntoIter<(L, R)>,
}

impl<L, R> Iterator for IntoIter<L, R> {
    type Item = (L, R);

    fn next(&mut self) -> Option<(L, R)> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<L, R> DoubleEndedIterator for IntoIter<L, R> {
    fn next_back(&mut self) -> Option<(L, R)> {
        self.inner.next_back()
    }
}

impl<L, R> ExactSizeIterator for IntoIter<L, R> {}

impl<L, R> FusedIterator for IntoIter<L, R> {}
