//! The element store.
//!
//! Every element of a map lives in one slot of a `Vec`-backed arena and is
//! addressed by its [`NodeId`] for its whole life. Both trees link elements
//! through these ids, so an element can sit in two trees at once without
//! either tree owning it.
//!
//! Vacant slots form an intrusive free list, so releasing an element never
//! allocates. Every slot carries a generation counter that is bumped when its
//! element is released; a [`Handle`] remembers the generation it was created
//! with, and stops resolving once its element is gone.
//!
//! Allocation is split in two: [`Store::reserve_one`] does everything that can
//! fail, and [`Store::insert`] then places the element without failing.

use crate::Result;
use std::ops::{Index, IndexMut};

#[cfg(any(test, feature = "fault-injection"))]
use crate::fault::check as injected_fault;

#[cfg(not(any(test, feature = "fault-injection")))]
#[inline(always)]
fn injected_fault() -> Result<()> {
    Ok(())
}

/// The type used for treap priorities.
/// Convention: a bigger number goes higher up the tree.
pub type Priority = u64;

/// Index of an element slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Parent and children of an element inside one of the two trees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Links {
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
}

/// An element: one left value, one right value, and the links that place it in both trees.
/// Only the links change after the element is created.
#[derive(Clone, Debug)]
pub struct Element<L, R> {
    pub(crate) left_value: L,
    pub(crate) right_value: R,
    pub(crate) priority: Priority,
    pub(crate) by_left: Links,
    pub(crate) by_right: Links,
}

impl<L, R> Element<L, R> {
    pub(crate) fn new(left_value: L, right_value: R, priority: Priority) -> Self {
        Element {
            left_value,
            right_value,
            priority,
            by_left: Links::default(),
            by_right: Links::default(),
        }
    }
}

#[derive(Clone, Debug)]
enum Slot<L, R> {
    Occupied {
        generation: u32,
        element: Element<L, R>,
    },
    Vacant {
        generation: u32,
        next_free: Option<NodeId>,
    },
}

impl<L, R> Slot<L, R> {
    fn generation(&self) -> u32 {
        match self {
            Slot::Occupied { generation, .. } | Slot::Vacant { generation, .. } => *generation,
        }
    }
}

/// A detached reference to an element of a [`BiMap`](crate::BiMap).
///
/// Unlike a [`Cursor`](crate::Cursor), a handle does not borrow the map, so it survives
/// mutations. It keeps pointing at the same element until that element is erased (or the
/// map is cleared), after which it no longer resolves. A handle is only meaningful for
/// the map that produced it, and for copies of that map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

const VACANT_SLOT_ERROR: &str = "invariant violated: node id refers to a vacant slot";

pub struct Store<L, R> {
    slots: Vec<Slot<L, R>>,
    free: Option<NodeId>,
    len: usize,
}

impl<L, R> Default for Store<L, R> {
    fn default() -> Self {
        Store::new()
    }
}

impl<L, R> Store<L, R> {
    /// Doesn't allocate.
    pub fn new() -> Self {
        Store {
            slots: Vec::new(),
            free: None,
            len: 0,
        }
    }

    /// The number of live elements.
    pub fn len(&self) -> usize {
        self.len
    }

    fn vacant(&self) -> usize {
        self.slots.len() - self.len
    }

    /// Makes sure `additional` more elements can be inserted without allocating.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let needed = additional.saturating_sub(self.vacant());
        if self.slots.len() + needed > u32::MAX as usize {
            return Err(crate::Error::AllocFailed);
        }
        if self.slots.capacity() - self.slots.len() < needed {
            log::trace!(
                "growing element store from {} slots for {} more elements",
                self.slots.capacity(),
                needed
            );
            self.slots.try_reserve(needed)?;
        }
        Ok(())
    }

    /// The allocation point of a single insertion.
    /// After this succeeds, the next [`Store::insert`] can't fail.
    pub fn reserve_one(&mut self) -> Result<()> {
        injected_fault()?;
        self.reserve(1)
    }

    /// Places the element into a vacant slot, or at the end of the arena.
    /// Must be preceded by a successful [`Store::reserve_one`].
    pub fn insert(&mut self, element: Element<L, R>) -> NodeId {
        self.len += 1;
        match self.free {
            Some(id) => {
                let slot = &mut self.slots[id.index()];
                let (generation, next_free) = match *slot {
                    Slot::Vacant {
                        generation,
                        next_free,
                    } => (generation, next_free),
                    Slot::Occupied { .. } => {
                        panic!("invariant violated: free list reached an occupied slot")
                    }
                };
                *slot = Slot::Occupied {
                    generation,
                    element,
                };
                self.free = next_free;
                id
            }
            None => {
                debug_assert!(self.slots.len() < self.slots.capacity());
                let id = NodeId(self.slots.len() as u32);
                self.slots.push(Slot::Occupied {
                    generation: 0,
                    element,
                });
                id
            }
        }
    }

    /// Releases the slot and returns its element.
    /// The element must already be unlinked from both trees.
    pub fn remove(&mut self, id: NodeId) -> Element<L, R> {
        let slot = &mut self.slots[id.index()];
        let vacant = Slot::Vacant {
            generation: slot.generation().wrapping_add(1),
            next_free: self.free,
        };
        match std::mem::replace(slot, vacant) {
            Slot::Occupied { element, .. } => {
                self.free = Some(id);
                self.len -= 1;
                element
            }
            Slot::Vacant { .. } => panic!("{}", VACANT_SLOT_ERROR),
        }
    }

    /// Releases every element. The elements are dropped one by one, so this
    /// never recurses, and it never allocates.
    pub fn clear(&mut self) {
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            if let Slot::Occupied { generation, .. } = *slot {
                let old = std::mem::replace(
                    slot,
                    Slot::Vacant {
                        generation: generation.wrapping_add(1),
                        next_free: self.free,
                    },
                );
                self.free = Some(NodeId(index as u32));
                self.len -= 1;
                drop(old);
            }
        }
    }

    pub fn handle(&self, id: NodeId) -> Handle {
        Handle {
            index: id.0,
            generation: self.slots[id.index()].generation(),
        }
    }

    /// Returns the element's id if the handle still refers to a live element.
    pub fn resolve(&self, handle: Handle) -> Option<NodeId> {
        match self.slots.get(handle.index as usize)? {
            Slot::Occupied { generation, .. } if *generation == handle.generation => {
                Some(NodeId(handle.index))
            }
            _ => None,
        }
    }

    /// Iterates over the live elements, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Element<L, R>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied { element, .. } => Some((NodeId(index as u32), element)),
                Slot::Vacant { .. } => None,
            })
    }

    /// Copies the store slot for slot, so that ids, links and handles carry over.
    /// One allocation point for the arena, plus one per copied element.
    pub fn try_clone(&self) -> Result<Self>
    where
        L: Clone,
        R: Clone,
    {
        injected_fault()?;
        let mut slots = Vec::new();
        slots.try_reserve_exact(self.slots.len())?;
        for slot in self.slots.iter() {
            if let Slot::Occupied { .. } = slot {
                injected_fault()?;
            }
            slots.push(slot.clone());
        }
        Ok(Store {
            slots,
            free: self.free,
            len: self.len,
        })
    }

    /// Checks the slot accounting: the free list covers exactly the vacant slots.
    /// Panics if it doesn't.
    pub fn assert_correctness(&self) {
        let mut free_count = 0;
        let mut current = self.free;
        while let Some(id) = current {
            free_count += 1;
            assert!(free_count <= self.slots.len(), "free list has a cycle");
            current = match self.slots[id.index()] {
                Slot::Vacant { next_free, .. } => next_free,
                Slot::Occupied { .. } => panic!("free list reached an occupied slot"),
            };
        }
        assert_eq!(free_count, self.vacant(), "free list misses vacant slots");
        assert_eq!(self.iter().count(), self.len, "live element count is off");
    }
}

impl<L, R> Index<NodeId> for Store<L, R> {
    type Output = Element<L, R>;

    fn index(&self, id: NodeId) -> &Element<L, R> {
        match &self.slots[id.index()] {
            Slot::Occupied { element, .. } => element,
            Slot::Vacant { .. } => panic!("{}", VACANT_SLOT_ERROR),
        }
    }
}

impl<L, R> IndexMut<NodeId> for Store<L, R> {
    fn index_mut(&mut self, id: NodeId) -> &mut Element<L, R> {
        match &mut self.slots[id.index()] {
            Slot::Occupied { element, .. } => element,
            Slot::Vacant { .. } => panic!("{}", VACANT_SLOT_ERROR),
        }
    }
}
