//! An ordered map and an ordered set backed by a height-balanced (AVL) binary search tree.
//!
//! [`AvlTree`] is the engine: it keeps every node's subtrees within one level
//! of each other, so insertion, removal and lookup take O(log n) whatever the
//! order of operations. [`AvlMap`] and [`AvlSet`] are thin views over it; the
//! set is a tree with a unit payload.
//!
//! ```
//! use avl_concordance::{AvlMap, AvlSet};
//!
//! let mut lines = AvlMap::new();
//! lines.put("rust", AvlSet::new());
//! if let Some(set) = lines.get_mut("rust") {
//!     set.add(3);
//!     set.add(1);
//! }
//! let first: Vec<_> = lines.get("rust").into_iter().flat_map(|set| set.iter()).collect();
//! assert_eq!(first, [&1, &3]);
//! ```
//!
//! Enable the `tracing` feature to emit `trace` level events for every
//! rotation and unlinked node.

#[cfg(feature = "tracing")]
macro_rules! trace {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

mod error;
pub mod map;
pub mod set;
pub mod tree;

pub use error::EmptyTreeError;
pub use map::AvlMap;
pub use set::AvlSet;
pub use tree::AvlTree;
