//! Treap algorithms over the element store.
//!
//! Every function here works on one tree, picked by the order `O`, given the store
//! and that tree's root. The trees are linked through parent pointers, so a node can
//! be reached and moved from its id alone, without walking down from the root.
//!
//! Balancing follows the treap invariant: a node's priority is at least as large as
//! the priorities of its children. Since an element has a single priority, and
//! rotations are valid for any key order, the same priority balances both trees.
//!
//! Its operations take `O(log n)` expected time, probabilistically.
//!
//! The mutating functions never compare keys and never allocate. The position a new
//! element goes to is found beforehand with [`search`], so that everything that can
//! fail happens before the trees are touched.

mod order;

pub use order::*;

use crate::store::{Links, NodeId, Store};
use std::borrow::Borrow;
use std::cmp::Ordering;

/// Which child of its parent a node is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn flip(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// The result of looking a key up in one of the trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Search {
    /// An element with this key exists.
    Found(NodeId),
    /// The key is absent. A new element with this key would become
    /// the given child of the given node, or the root if the tree is empty.
    Vacant(Option<(NodeId, Side)>),
}

#[inline]
fn links<O, L, R>(store: &Store<L, R>, id: NodeId) -> Links
where
    O: Order<L, R>,
{
    *O::links(&store[id])
}

#[inline]
fn links_mut<O, L, R>(store: &mut Store<L, R>, id: NodeId) -> &mut Links
where
    O: Order<L, R>,
{
    O::links_mut(&mut store[id])
}

fn set_child<O, L, R>(store: &mut Store<L, R>, id: NodeId, side: Side, child: Option<NodeId>)
where
    O: Order<L, R>,
{
    let links = links_mut::<O, L, R>(store, id);
    match side {
        Side::Left => links.left = child,
        Side::Right => links.right = child,
    }
}

/// Puts `new` where `old` was, below `parent` (or at the root).
fn replace_child<O, L, R>(
    store: &mut Store<L, R>,
    root: &mut Option<NodeId>,
    parent: Option<NodeId>,
    old: NodeId,
    new: Option<NodeId>,
) where
    O: Order<L, R>,
{
    match parent {
        None => *root = new,
        Some(parent) => {
            let side = if links::<O, L, R>(store, parent).left == Some(old) {
                Side::Left
            } else {
                Side::Right
            };
            set_child::<O, L, R>(store, parent, side, new);
        }
    }
}

/// The leftmost node of the tree.
pub fn first<O, L, R>(store: &Store<L, R>, root: Option<NodeId>) -> Option<NodeId>
where
    O: Order<L, R>,
{
    let mut current = root?;
    while let Some(left) = links::<O, L, R>(store, current).left {
        current = left;
    }
    Some(current)
}

/// The rightmost node of the tree.
pub fn last<O, L, R>(store: &Store<L, R>, root: Option<NodeId>) -> Option<NodeId>
where
    O: Order<L, R>,
{
    let mut current = root?;
    while let Some(right) = links::<O, L, R>(store, current).right {
        current = right;
    }
    Some(current)
}

/// In-order successor.
pub fn next<O, L, R>(store: &Store<L, R>, id: NodeId) -> Option<NodeId>
where
    O: Order<L, R>,
{
    if let Some(right) = links::<O, L, R>(store, id).right {
        return first::<O, L, R>(store, Some(right));
    }
    let mut current = id;
    while let Some(parent) = links::<O, L, R>(store, current).parent {
        if links::<O, L, R>(store, parent).left == Some(current) {
            return Some(parent);
        }
        current = parent;
    }
    None
}

/// In-order predecessor.
pub fn prev<O, L, R>(store: &Store<L, R>, id: NodeId) -> Option<NodeId>
where
    O: Order<L, R>,
{
    if let Some(left) = links::<O, L, R>(store, id).left {
        return last::<O, L, R>(store, Some(left));
    }
    let mut current = id;
    while let Some(parent) = links::<O, L, R>(store, current).parent {
        if links::<O, L, R>(store, parent).right == Some(current) {
            return Some(parent);
        }
        current = parent;
    }
    None
}

/// Binary search for `key`.
pub fn search<O, L, R, Q>(store: &Store<L, R>, root: Option<NodeId>, key: &Q) -> Search
where
    O: Order<L, R>,
    O::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let mut position = None;
    let mut current = root;
    while let Some(id) = current {
        let node_links = links::<O, L, R>(store, id);
        match key.cmp(O::key(&store[id]).borrow()) {
            Ordering::Equal => return Search::Found(id),
            Ordering::Less => {
                position = Some((id, Side::Left));
                current = node_links.left;
            }
            Ordering::Greater => {
                position = Some((id, Side::Right));
                current = node_links.right;
            }
        }
    }
    Search::Vacant(position)
}

/// The first node whose key is not less than `key`.
pub fn lower_bound<O, L, R, Q>(store: &Store<L, R>, root: Option<NodeId>, key: &Q) -> Option<NodeId>
where
    O: Order<L, R>,
    O::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    bound::<O, L, R, Q, _>(store, root, |node_key| node_key >= key)
}

/// The first node whose key is greater than `key`.
pub fn upper_bound<O, L, R, Q>(store: &Store<L, R>, root: Option<NodeId>, key: &Q) -> Option<NodeId>
where
    O: Order<L, R>,
    O::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    bound::<O, L, R, Q, _>(store, root, |node_key| node_key > key)
}

// `is_after` must be monotone along the order: false for a prefix, true afterwards.
fn bound<O, L, R, Q, F>(store: &Store<L, R>, root: Option<NodeId>, is_after: F) -> Option<NodeId>
where
    O: Order<L, R>,
    O::Key: Borrow<Q>,
    Q: Ord + ?Sized,
    F: Fn(&Q) -> bool,
{
    let mut candidate = None;
    let mut current = root;
    while let Some(id) = current {
        let node_links = links::<O, L, R>(store, id);
        if is_after(O::key(&store[id]).borrow()) {
            candidate = Some(id);
            current = node_links.left;
        } else {
            current = node_links.right;
        }
    }
    candidate
}

/// The in-order neighbours a new node with the absent `key` would get,
/// as if `skip` had already been unlinked.
pub fn gap<O, L, R, Q>(
    store: &Store<L, R>,
    root: Option<NodeId>,
    key: &Q,
    skip: Option<NodeId>,
) -> (Option<NodeId>, Option<NodeId>)
where
    O: Order<L, R>,
    O::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let after = lower_bound::<O, L, R, Q>(store, root, key);
    let mut before = match after {
        Some(after) => prev::<O, L, R>(store, after),
        None => last::<O, L, R>(store, root),
    };
    let mut after = after;
    if let Some(skip) = skip {
        if after == Some(skip) {
            after = next::<O, L, R>(store, skip);
        }
        if before == Some(skip) {
            before = prev::<O, L, R>(store, skip);
        }
    }
    (before, after)
}

/// The position between two in-order neighbours, in the form [`search`] reports it.
/// Of two adjacent nodes, either the first has no right child or the second has no
/// left child, so no keys need to be compared.
pub fn position_between<O, L, R>(
    store: &Store<L, R>,
    (before, after): (Option<NodeId>, Option<NodeId>),
) -> Option<(NodeId, Side)>
where
    O: Order<L, R>,
{
    match (before, after) {
        (Some(before), _) if links::<O, L, R>(store, before).right.is_none() => {
            Some((before, Side::Right))
        }
        (_, Some(after)) => {
            debug_assert!(links::<O, L, R>(store, after).left.is_none());
            Some((after, Side::Left))
        }
        (Some(_), None) => panic!("invariant violated: the last node has a right child"),
        (None, None) => None,
    }
}

/// Rotates `id` above its parent. `id` must not be the root.
///
/// ```text
///       p              x
///      / \            / \
///     x   c   <->    a   p
///    / \                / \
///   a   b              b   c
/// ```
fn rotate_up<O, L, R>(store: &mut Store<L, R>, root: &mut Option<NodeId>, id: NodeId)
where
    O: Order<L, R>,
{
    let parent = match links::<O, L, R>(store, id).parent {
        Some(parent) => parent,
        None => panic!("invariant violated: rotating the root up"),
    };
    let grandparent = links::<O, L, R>(store, parent).parent;
    let side = if links::<O, L, R>(store, parent).left == Some(id) {
        Side::Left
    } else {
        Side::Right
    };

    // the inner subtree of `id` moves over to `parent`
    let inner = match side {
        Side::Left => links::<O, L, R>(store, id).right,
        Side::Right => links::<O, L, R>(store, id).left,
    };
    set_child::<O, L, R>(store, parent, side, inner);
    if let Some(inner) = inner {
        links_mut::<O, L, R>(store, inner).parent = Some(parent);
    }

    set_child::<O, L, R>(store, id, side.flip(), Some(parent));
    links_mut::<O, L, R>(store, parent).parent = Some(id);
    links_mut::<O, L, R>(store, id).parent = grandparent;
    replace_child::<O, L, R>(store, root, grandparent, parent, Some(id));
}

/// Links a detached node into the tree at `position` (as returned by [`search`]),
/// then rotates it up until its parent's priority is at least its own.
pub fn link<O, L, R>(
    store: &mut Store<L, R>,
    root: &mut Option<NodeId>,
    id: NodeId,
    position: Option<(NodeId, Side)>,
) where
    O: Order<L, R>,
{
    *links_mut::<O, L, R>(store, id) = Links::default();
    match position {
        None => {
            debug_assert!(root.is_none());
            *root = Some(id);
            return;
        }
        Some((parent, side)) => {
            set_child::<O, L, R>(store, parent, side, Some(id));
            links_mut::<O, L, R>(store, id).parent = Some(parent);
        }
    }

    let priority = store[id].priority;
    while let Some(parent) = links::<O, L, R>(store, id).parent {
        let parent_priority = store[parent].priority;
        if parent_priority == priority {
            log::debug!("found equal priorities {}", priority);
        }
        if parent_priority >= priority {
            break;
        }
        rotate_up::<O, L, R>(store, root, id);
    }
}

/// Detaches a node from the tree. The node is rotated down, always below its child of
/// higher priority (the left one on a tie), until it is a leaf, and is then cut off.
pub fn unlink<O, L, R>(store: &mut Store<L, R>, root: &mut Option<NodeId>, id: NodeId)
where
    O: Order<L, R>,
{
    loop {
        let node_links = links::<O, L, R>(store, id);
        let child = match (node_links.left, node_links.right) {
            (None, None) => break,
            (Some(child), None) | (None, Some(child)) => child,
            (Some(left), Some(right)) => {
                if store[left].priority >= store[right].priority {
                    left
                } else {
                    right
                }
            }
        };
        rotate_up::<O, L, R>(store, root, child);
    }
    let parent = links::<O, L, R>(store, id).parent;
    replace_child::<O, L, R>(store, root, parent, id, None);
    *links_mut::<O, L, R>(store, id) = Links::default();
}

/// Checks that the tree is a valid treap over `store`:
/// keys strictly increase in order, children point back at their parents,
/// and priorities are heap ordered. Returns the number of nodes.
/// If it finds any violation, it panics.
pub fn assert_correctness<O, L, R>(store: &Store<L, R>, root: Option<NodeId>) -> usize
where
    O: Order<L, R>,
{
    if let Some(root) = root {
        assert_eq!(links::<O, L, R>(store, root).parent, None, "the root has a parent");
    }
    let mut count = 0;
    let mut previous: Option<NodeId> = None;
    let mut current = first::<O, L, R>(store, root);
    while let Some(id) = current {
        count += 1;
        assert!(count <= store.len(), "the tree has more nodes than the store");

        let node_links = links::<O, L, R>(store, id);
        for &child in [node_links.left, node_links.right].iter().flatten() {
            assert_eq!(
                links::<O, L, R>(store, child).parent,
                Some(id),
                "a child doesn't point back at its parent"
            );
            assert!(
                store[id].priority >= store[child].priority,
                "priorities are not heap ordered"
            );
        }
        if let Some(previous) = previous {
            assert!(
                O::key(&store[previous]) < O::key(&store[id]),
                "keys are not strictly increasing"
            );
        }
        previous = Some(id);
        current = next::<O, L, R>(store, id);
    }
    count
}
