//! The [`BiMap`] container.

use crate::cursor::{Cursor, LeftCursor, RightCursor};
use crate::iterators::{IntoIter, Iter};
use crate::store::{Element, NodeId, Store};
use crate::treap::{self, ByLeft, ByRight, Order, Roots, Search, Side};
use crate::{Error, Handle, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::ops::{Bound, RangeBounds};
use std::sync::atomic::{self, AtomicU64};

/// A seed that differs between maps and between runs, obtained without allocating.
/// (`rand::random` sets up the thread's generator on first use, which allocates.)
fn fresh_seed() -> u64 {
    static MAPS: AtomicU64 = AtomicU64::new(0);
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(MAPS.fetch_add(1, atomic::Ordering::Relaxed));
    hasher.finish()
}

/// A one-to-one map between left values and right values.
///
/// Every left value maps to exactly one right value, and the other way around.
/// The pairs are kept in two treaps over one shared set of elements: one tree ordered
/// by the left values, and one by the right values. Both directions support lookup,
/// insertion and removal in `O(log n)` expected time, and in-order traversal.
///
/// A failed operation leaves the map exactly as it was. Construction, moving,
/// [`BiMap::swap`], [`BiMap::clear`] and erasing never fail.
///
///```
/// use bitreap::BiMap;
///
/// let mut map = BiMap::new();
/// map.insert(1, 2).unwrap();
/// map.insert(8, 7).unwrap();
/// map.insert(5, 6).unwrap();
/// map.insert(4, 3).unwrap();
///
/// assert_eq!(map.left_values().copied().collect::<Vec<_>>(), vec![1, 4, 5, 8]);
/// assert_eq!(map.right_values().copied().collect::<Vec<_>>(), vec![2, 3, 6, 7]);
/// assert_eq!(map.find_left(&5).flip().get(), Some(&6));
///
/// assert!(map.erase_left(&5));
/// assert_eq!(map.len(), 3);
/// assert_eq!(map.get_by_right(&6), None);
///```
pub struct BiMap<L, R> {
    pub(crate) store: Store<L, R>,
    pub(crate) roots: Roots,
    rng: StdRng,
}

impl<L, R> BiMap<L, R> {
    /// Creates an empty map, with a randomly seeded priority source.
    /// Never fails, and doesn't allocate.
    pub fn new() -> Self {
        Self::with_seed(fresh_seed())
    }

    /// Creates an empty map whose tree shapes are determined by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Creates an empty map that draws its priorities from `rng`.
    pub fn with_rng(rng: StdRng) -> Self {
        BiMap {
            store: Store::new(),
            roots: Roots::default(),
            rng,
        }
    }

    /// Creates an empty map with room for `capacity` elements.
    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        let mut map = Self::new();
        map.reserve(capacity)?;
        Ok(map)
    }

    /// Makes room for `additional` more elements, so that the next `additional`
    /// insertions don't need to grow the element store.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        self.store.reserve(additional)
    }

    /// The number of pairs in the map.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every pair. Never fails.
    /// Handles to the removed elements stop resolving.
    pub fn clear(&mut self) {
        self.roots = Roots::default();
        self.store.clear();
    }

    /// Exchanges the contents of two maps in `O(1)`. Never fails.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    /// Copies the map. The copy shares nothing with `self`.
    /// Handles of `self` are also valid for the copy.
    pub fn try_clone(&self) -> Result<Self>
    where
        L: Clone,
        R: Clone,
    {
        log::debug!("copying a map of {} elements", self.len());
        Ok(BiMap {
            store: self.store.try_clone()?,
            roots: self.roots,
            rng: self.rng.clone(),
        })
    }

    /// Replaces the contents of `self` with a copy of `source`.
    /// If the copy fails, `self` keeps its old contents.
    pub fn try_clone_from(&mut self, source: &Self) -> Result<()>
    where
        L: Clone,
        R: Clone,
    {
        let mut copy = source.try_clone()?;
        self.swap(&mut copy);
        Ok(())
    }

    /// Resolves a handle to the element it points at, if it's still in the map.
    pub fn get_by_handle(&self, handle: Handle) -> Option<(&L, &R)> {
        let element = &self.store[self.store.resolve(handle)?];
        Some((&element.left_value, &element.right_value))
    }

    /// A cursor in the left order at the element of `handle`.
    pub fn left_cursor(&self, handle: Handle) -> Option<LeftCursor<'_, L, R>> {
        Some(Cursor::new(self, Some(self.store.resolve(handle)?)))
    }

    /// A cursor in the right order at the element of `handle`.
    pub fn right_cursor(&self, handle: Handle) -> Option<RightCursor<'_, L, R>> {
        Some(Cursor::new(self, Some(self.store.resolve(handle)?)))
    }

    /// The end position of the left order.
    pub fn end_left(&self) -> LeftCursor<'_, L, R> {
        Cursor::new(self, None)
    }

    /// The end position of the right order.
    pub fn end_right(&self) -> RightCursor<'_, L, R> {
        Cursor::new(self, None)
    }

    /// Unlinks the element from both trees and releases it.
    fn remove_node(&mut self, id: NodeId) -> (L, R)
    where
        L: Ord,
        R: Ord,
    {
        treap::unlink::<ByLeft, L, R>(&mut self.store, &mut self.roots.by_left, id);
        treap::unlink::<ByRight, L, R>(&mut self.store, &mut self.roots.by_right, id);
        let element = self.store.remove(id);
        (element.left_value, element.right_value)
    }
}

impl<L: Ord, R: Ord> BiMap<L, R> {
    /// Where a new element with this key would go in the order `O`.
    fn vacancy<O, Q>(&self, key: &Q, duplicate: Error) -> Result<Option<(NodeId, Side)>>
    where
        O: Order<L, R>,
        O::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match treap::search::<O, L, R, Q>(&self.store, O::root(&self.roots), key) {
            Search::Found(_) => Err(duplicate),
            Search::Vacant(position) => Ok(position),
        }
    }

    fn find_node<O, Q>(&self, key: &Q) -> Option<NodeId>
    where
        O: Order<L, R>,
        O::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match treap::search::<O, L, R, Q>(&self.store, O::root(&self.roots), key) {
            Search::Found(id) => Some(id),
            Search::Vacant(_) => None,
        }
    }

    /// Creates the element and links it into both trees.
    /// The positions must come from searches made after the last mutation,
    /// and a slot must have been reserved. Can't fail.
    fn link_new(
        &mut self,
        left: L,
        right: R,
        left_position: Option<(NodeId, Side)>,
        right_position: Option<(NodeId, Side)>,
    ) -> NodeId {
        let priority = self.rng.gen();
        let id = self.store.insert(Element::new(left, right, priority));
        treap::link::<ByLeft, L, R>(&mut self.store, &mut self.roots.by_left, id, left_position);
        treap::link::<ByRight, L, R>(&mut self.store, &mut self.roots.by_right, id, right_position);
        id
    }

    /// The neighbours of `id` in the order `O`. An element with the same key as `id`
    /// goes between them once `id` is gone.
    fn neighbours<O: Order<L, R>>(&self, id: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        (
            treap::prev::<O, L, R>(&self.store, id),
            treap::next::<O, L, R>(&self.store, id),
        )
    }

    /// Like [`BiMap::link_new`], with positions given as in-order neighbours.
    /// Doesn't compare keys, so it can run after elements have been removed.
    fn link_into_gaps(
        &mut self,
        left: L,
        right: R,
        left_gap: (Option<NodeId>, Option<NodeId>),
        right_gap: (Option<NodeId>, Option<NodeId>),
    ) -> NodeId {
        let left_position = treap::position_between::<ByLeft, L, R>(&self.store, left_gap);
        let right_position = treap::position_between::<ByRight, L, R>(&self.store, right_gap);
        self.link_new(left, right, left_position, right_position)
    }

    /// Inserts the pair `(left, right)`, and returns a handle to the new element.
    ///
    /// Fails with [`Error::DuplicateLeft`] or [`Error::DuplicateRight`] if either value
    /// is already in the map, and with [`Error::AllocFailed`] if there is no memory for
    /// the element. In both cases the map isn't modified.
    pub fn insert(&mut self, left: L, right: R) -> Result<Handle> {
        // every comparison and every allocation happens before the trees are touched
        let left_position = self.vacancy::<ByLeft, L>(&left, Error::DuplicateLeft)?;
        let right_position = self.vacancy::<ByRight, R>(&right, Error::DuplicateRight)?;
        self.store.reserve_one()?;
        let id = self.link_new(left, right, left_position, right_position);
        Ok(self.store.handle(id))
    }

    /// The cursor at the element with left value `left`, or the end position.
    pub fn find_left<Q>(&self, left: &Q) -> LeftCursor<'_, L, R>
    where
        L: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor::new(self, self.find_node::<ByLeft, Q>(left))
    }

    /// The cursor at the element with right value `right`, or the end position.
    pub fn find_right<Q>(&self, right: &Q) -> RightCursor<'_, L, R>
    where
        R: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor::new(self, self.find_node::<ByRight, Q>(right))
    }

    pub fn contains_left<Q>(&self, left: &Q) -> bool
    where
        L: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node::<ByLeft, Q>(left).is_some()
    }

    pub fn contains_right<Q>(&self, right: &Q) -> bool
    where
        R: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node::<ByRight, Q>(right).is_some()
    }

    /// The right value that `left` maps to.
    pub fn get_by_left<Q>(&self, left: &Q) -> Option<&R>
    where
        L: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_left(left).right()
    }

    /// The left value that `right` maps to.
    pub fn get_by_right<Q>(&self, right: &Q) -> Option<&L>
    where
        R: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_right(right).left()
    }

    /// Like [`BiMap::get_by_left`], but reports a missing value as [`Error::MissingLeft`].
    pub fn at_left<Q>(&self, left: &Q) -> Result<&R>
    where
        L: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_by_left(left).ok_or(Error::MissingLeft)
    }

    /// Like [`BiMap::get_by_right`], but reports a missing value as [`Error::MissingRight`].
    pub fn at_right<Q>(&self, right: &Q) -> Result<&L>
    where
        R: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_by_right(right).ok_or(Error::MissingRight)
    }

    /// Returns the right value that `left` maps to.
    /// If `left` isn't in the map, maps it to `R::default()` first, removing the
    /// element that `R::default()` was mapped to, if any.
    ///
    /// A failed call, or a panic in `Ord`, leaves the map unchanged.
    ///
    ///```
    /// use bitreap::BiMap;
    ///
    /// let mut map: BiMap<i32, i32> = vec![(1, 0), (2, 5)].into_iter().collect();
    /// assert_eq!(map.at_left_or_default(2), Ok(&5));
    /// assert_eq!(map.at_left_or_default(3), Ok(&0));
    /// assert_eq!(map.get_by_left(&1), None);
    /// assert_eq!(map.len(), 2);
    ///```
    pub fn at_left_or_default(&mut self, left: L) -> Result<&R>
    where
        R: Default,
    {
        let id = match self.find_node::<ByLeft, L>(&left) {
            Some(id) => id,
            None => {
                let right = R::default();
                // every comparison and the allocation happen before anything is unlinked
                let old = self.find_node::<ByRight, R>(&right);
                let left_gap =
                    treap::gap::<ByLeft, L, R, L>(&self.store, self.roots.by_left, &left, old);
                let right_gap = match old {
                    Some(old) => self.neighbours::<ByRight>(old),
                    None => {
                        treap::gap::<ByRight, L, R, R>(&self.store, self.roots.by_right, &right, None)
                    }
                };
                self.store.reserve_one()?;
                if let Some(old) = old {
                    self.remove_node(old);
                }
                self.link_into_gaps(left, right, left_gap, right_gap)
            }
        };
        Ok(&self.store[id].right_value)
    }

    /// Returns the left value that `right` maps to.
    /// If `right` isn't in the map, maps it to `L::default()` first, removing the
    /// element that `L::default()` was mapped to, if any.
    pub fn at_right_or_default(&mut self, right: R) -> Result<&L>
    where
        L: Default,
    {
        let id = match self.find_node::<ByRight, R>(&right) {
            Some(id) => id,
            None => {
                let left = L::default();
                let old = self.find_node::<ByLeft, L>(&left);
                let right_gap =
                    treap::gap::<ByRight, L, R, R>(&self.store, self.roots.by_right, &right, old);
                let left_gap = match old {
                    Some(old) => self.neighbours::<ByLeft>(old),
                    None => {
                        treap::gap::<ByLeft, L, R, L>(&self.store, self.roots.by_left, &left, None)
                    }
                };
                self.store.reserve_one()?;
                if let Some(old) = old {
                    self.remove_node(old);
                }
                self.link_into_gaps(left, right, left_gap, right_gap)
            }
        };
        Ok(&self.store[id].left_value)
    }

    /// The cursor at the smallest left value.
    pub fn begin_left(&self) -> LeftCursor<'_, L, R> {
        Cursor::new(self, treap::first::<ByLeft, L, R>(&self.store, self.roots.by_left))
    }

    /// The cursor at the smallest right value.
    pub fn begin_right(&self) -> RightCursor<'_, L, R> {
        Cursor::new(self, treap::first::<ByRight, L, R>(&self.store, self.roots.by_right))
    }

    /// The cursor at the first left value not less than `left`.
    pub fn lower_bound_left<Q>(&self, left: &Q) -> LeftCursor<'_, L, R>
    where
        L: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor::new(self, treap::lower_bound::<ByLeft, L, R, Q>(&self.store, self.roots.by_left, left))
    }

    /// The cursor at the first left value greater than `left`.
    pub fn upper_bound_left<Q>(&self, left: &Q) -> LeftCursor<'_, L, R>
    where
        L: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor::new(self, treap::upper_bound::<ByLeft, L, R, Q>(&self.store, self.roots.by_left, left))
    }

    /// The cursor at the first right value not less than `right`.
    pub fn lower_bound_right<Q>(&self, right: &Q) -> RightCursor<'_, L, R>
    where
        R: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor::new(self, treap::lower_bound::<ByRight, L, R, Q>(&self.store, self.roots.by_right, right))
    }

    /// The cursor at the first right value greater than `right`.
    pub fn upper_bound_right<Q>(&self, right: &Q) -> RightCursor<'_, L, R>
    where
        R: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor::new(self, treap::upper_bound::<ByRight, L, R, Q>(&self.store, self.roots.by_right, right))
    }

    /// Removes the element with left value `left`, and returns its pair.
    pub fn remove_by_left<Q>(&mut self, left: &Q) -> Option<(L, R)>
    where
        L: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let id = self.find_node::<ByLeft, Q>(left)?;
        Some(self.remove_node(id))
    }

    /// Removes the element with right value `right`, and returns its pair.
    pub fn remove_by_right<Q>(&mut self, right: &Q) -> Option<(L, R)>
    where
        R: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let id = self.find_node::<ByRight, Q>(right)?;
        Some(self.remove_node(id))
    }

    /// Removes the element with left value `left`.
    /// Returns `false` if there was none.
    pub fn erase_left<Q>(&mut self, left: &Q) -> bool
    where
        L: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_by_left(left).is_some()
    }

    /// Removes the element with right value `right`.
    /// Returns `false` if there was none.
    pub fn erase_right<Q>(&mut self, right: &Q) -> bool
    where
        R: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_by_right(right).is_some()
    }

    fn erase_at<O: Order<L, R>>(&mut self, handle: Handle) -> Option<Handle> {
        let id = self.store.resolve(handle)?;
        let next = treap::next::<O, L, R>(&self.store, id);
        self.remove_node(id);
        next.map(|next| self.store.handle(next))
    }

    /// Removes the element of `handle`, and returns a handle to the element that
    /// followed it in the left order. Returns [`None`] if the removed element was the
    /// last one, or if the handle no longer resolves (in which case nothing is removed).
    pub fn erase_left_at(&mut self, handle: Handle) -> Option<Handle> {
        self.erase_at::<ByLeft>(handle)
    }

    /// Removes the element of `handle`, and returns a handle to the element that
    /// followed it in the right order. Returns [`None`] if the removed element was the
    /// last one, or if the handle no longer resolves (in which case nothing is removed).
    pub fn erase_right_at(&mut self, handle: Handle) -> Option<Handle> {
        self.erase_at::<ByRight>(handle)
    }

    fn erase_range<O, Q, B>(&mut self, range: B) -> usize
    where
        O: Order<L, R>,
        O::Key: Borrow<Q>,
        Q: Ord + ?Sized,
        B: RangeBounds<Q>,
    {
        let root = O::root(&self.roots);
        let start = match range.start_bound() {
            Bound::Included(key) => treap::lower_bound::<O, L, R, Q>(&self.store, root, key),
            Bound::Excluded(key) => treap::upper_bound::<O, L, R, Q>(&self.store, root, key),
            Bound::Unbounded => treap::first::<O, L, R>(&self.store, root),
        };
        let end = match range.end_bound() {
            Bound::Included(key) => treap::upper_bound::<O, L, R, Q>(&self.store, root, key),
            Bound::Excluded(key) => treap::lower_bound::<O, L, R, Q>(&self.store, root, key),
            Bound::Unbounded => None,
        };
        // an empty or reversed range
        if let (Some(start), Some(end)) = (start, end) {
            if O::key(&self.store[start]) >= O::key(&self.store[end]) {
                return 0;
            }
        }
        if start.is_none() {
            return 0;
        }

        let mut count = 0;
        let mut current = start;
        while let Some(id) = current {
            if current == end {
                break;
            }
            current = treap::next::<O, L, R>(&self.store, id);
            self.remove_node(id);
            count += 1;
        }
        count
    }

    /// Removes every element whose left value is in `range`.
    /// Returns the number of removed elements.
    pub fn erase_left_range<Q, B>(&mut self, range: B) -> usize
    where
        L: Borrow<Q>,
        Q: Ord + ?Sized,
        B: RangeBounds<Q>,
    {
        self.erase_range::<ByLeft, Q, B>(range)
    }

    /// Removes every element whose right value is in `range`.
    /// Returns the number of removed elements.
    pub fn erase_right_range<Q, B>(&mut self, range: B) -> usize
    where
        R: Borrow<Q>,
        Q: Ord + ?Sized,
        B: RangeBounds<Q>,
    {
        self.erase_range::<ByRight, Q, B>(range)
    }

    /// Iterates over the pairs, ordered by the left values.
    pub fn iter_left(&self) -> Iter<'_, L, R, ByLeft> {
        Iter::new(self)
    }

    /// Iterates over the pairs, ordered by the right values.
    pub fn iter_right(&self) -> Iter<'_, L, R, ByRight> {
        Iter::new(self)
    }

    /// The left values, in increasing order.
    pub fn left_values(&self) -> impl DoubleEndedIterator<Item = &L> + ExactSizeIterator + '_ {
        self.iter_left().map(|(left, _)| left)
    }

    /// The right values, in increasing order.
    pub fn right_values(&self) -> impl DoubleEndedIterator<Item = &R> + ExactSizeIterator + '_ {
        self.iter_right().map(|(_, right)| right)
    }

    /// Checks that invariants remain correct: both trees are valid treaps over the same
    /// elements, their sizes match the length of the map, and the element store's
    /// accounting is consistent.
    /// If it finds any violation, it panics.
    pub fn assert_correctness(&self) {
        self.store.assert_correctness();
        let by_left = treap::assert_correctness::<ByLeft, L, R>(&self.store, self.roots.by_left);
        let by_right = treap::assert_correctness::<ByRight, L, R>(&self.store, self.roots.by_right);
        assert_eq!(by_left, self.len(), "the left tree misses elements");
        assert_eq!(by_right, self.len(), "the right tree misses elements");
    }
}

impl<L, R> Default for BiMap<L, R> {
    fn default() -> Self {
        BiMap::new()
    }
}

impl<L: Clone, R: Clone> Clone for BiMap<L, R> {
    /// Panics if memory runs out, like the standard collections do.
    /// Use [`BiMap::try_clone`] to handle that case.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(copy) => copy,
            Err(err) => panic!("couldn't copy a map of {} elements: {}", self.len(), err),
        }
    }
}

/// Two maps are equal if they hold the same pairs.
impl<L: Ord, R: Ord> PartialEq for BiMap<L, R> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter_left().eq(other.iter_left())
    }
}

impl<L: Ord, R: Ord> Eq for BiMap<L, R> {}

impl<L: Ord + fmt::Debug, R: Ord + fmt::Debug> fmt::Debug for BiMap<L, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter_left()).finish()
    }
}

impl<L: Ord, R: Ord> Extend<(L, R)> for BiMap<L, R> {
    /// Pairs that collide with a value already in the map are skipped.
    /// Panics if memory runs out.
    fn extend<T: IntoIterator<Item = (L, R)>>(&mut self, iter: T) {
        for (left, right) in iter {
            match self.insert(left, right) {
                Ok(_) | Err(Error::DuplicateLeft) | Err(Error::DuplicateRight) => (),
                Err(err) => panic!("couldn't insert into a map of {} elements: {}", self.len(), err),
            }
        }
    }
}

impl<L: Ord, R: Ord> std::iter::FromIterator<(L, R)> for BiMap<L, R> {
    /// Pairs that collide with an earlier pair are skipped.
    fn from_iter<T: IntoIterator<Item = (L, R)>>(iter: T) -> Self {
        let mut map = BiMap::new();
        map.extend(iter);
        map
    }
}

impl<'a, L: Ord, R: Ord> IntoIterator for &'a BiMap<L, R> {
    type Item = (&'a L, &'a R);
    type IntoIter = Iter<'a, L, R, ByLeft>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_left()
    }
}

impl<L: Ord, R: Ord> IntoIterator for BiMap<L, R> {
    type Item = (L, R);
    type IntoIter = IntoIter<L, R>;

    /// Yields the pairs ordered by the left values.
    fn into_iter(mut self) -> Self::IntoIter {
        let mut order = Vec::with_capacity(self.len());
        let mut current = treap::first::<ByLeft, L, R>(&self.store, self.roots.by_left);
        while let Some(id) = current {
            order.push(id);
            current = treap::next::<ByLeft, L, R>(&self.store, id);
        }
        let pairs: Vec<_> = order
            .into_iter()
            .map(|id| {
                let element = self.store.remove(id);
                (element.left_value, element.right_value)
            })
            .collect();
        IntoIter {
            inner: pairs.into_iter(),
        }
    }
}
