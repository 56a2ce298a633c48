//! The two orders of a map.
//!
//! [`ByLeft`] and [`ByRight`] are marker types. Each one picks out, from an element,
//! the key that its tree is ordered by and the links that place the element in that tree.
//! The tree algorithms are written once, generically over the order.

use crate::store::{Element, Links, NodeId};

/// The roots of both trees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Roots {
    pub(crate) by_left: Option<NodeId>,
    pub(crate) by_right: Option<NodeId>,
}

/// One of the two orders of a [`BiMap`](crate::BiMap).
///
/// This trait can't be implemented outside of this crate: its methods mention
/// crate-internal types.
pub trait Order<L, R> {
    /// The values this order sorts by.
    type Key: Ord;
    /// The opposite order.
    type Other: Order<L, R>;

    #[doc(hidden)]
    fn key(element: &Element<L, R>) -> &Self::Key;
    #[doc(hidden)]
    fn links(element: &Element<L, R>) -> &Links;
    #[doc(hidden)]
    fn links_mut(element: &mut Element<L, R>) -> &mut Links;
    #[doc(hidden)]
    fn root(roots: &Roots) -> Option<NodeId>;
}

/// The order of the left values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ByLeft {}

/// The order of the right values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ByRight {}

impl<L: Ord, R: Ord> Order<L, R> for ByLeft {
    type Key = L;
    type Other = ByRight;

    fn key(element: &Element<L, R>) -> &L {
        &element.left_value
    }

    fn links(element: &Element<L, R>) -> &Links {
        &element.by_left
    }

    fn links_mut(element: &mut Element<L, R>) -> &mut Links {
        &mut element.by_left
    }

    fn root(roots: &Roots) -> Option<NodeId> {
        roots.by_left
    }
}

impl<L: Ord, R: Ord> Order<L, R> for ByRight {
    type Key = R;
    type Other = ByLeft;

    fn key(element: &Element<L, R>) -> &R {
        &element.right_value
    }

    fn links(element: &Element<L, R>) -> &Links {
        &element.by_right
    }

    fn links_mut(element: &mut Element<L, R>) -> &mut Links {
        &mut element.by_right
    }

    fn root(roots: &Roots) -> Option<NodeId> {
        roots.by_right
    }
}
