//! The balanced-tree engine shared by [`AvlMap`](crate::AvlMap) and [`AvlSet`](crate::AvlSet).

use std::borrow::Borrow;
use std::cmp::{self, Ordering};
use std::fmt;
use std::iter::{FromIterator, FusedIterator};
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use crate::error::EmptyTreeError;

/// Largest height difference tolerated between the two subtrees of a node.
const ALLOWED_IMBALANCE: isize = 1;

/// A height-balanced binary search tree mapping keys to values.
///
/// Every node owns its two subtrees. Insertion and removal descend
/// recursively and rebalance each node on the way back up, so the height of
/// the tree stays within the AVL bound whatever the order of operations.
///
/// ```
/// use avl_concordance::AvlTree;
/// let mut tree = AvlTree::new();
/// tree.insert(10, "ten");
/// tree.insert(20, "twenty");
/// tree.insert(30, "thirty");
/// assert_eq!(tree.get(&20), Some(&"twenty"));
/// assert_eq!(tree.min(), Ok(&10));
/// tree.remove(&20);
/// assert!(!tree.contains(&20));
/// ```
pub struct AvlTree<K, V> {
    root: Link<K, V>,
    num_nodes: usize,
    marker: PhantomData<Box<Node<K, V>>>,
}

struct Node<K, V> {
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
    height: isize,
}

type NodePtr<K, V> = NonNull<Node<K, V>>;
type Link<K, V> = Option<NodePtr<K, V>>;

/// An iterator over the entries of a tree in ascending key order.
pub struct Iter<'a, K, V> {
    stack: Vec<NodePtr<K, V>>,
    remaining: usize,
    marker: PhantomData<&'a Node<K, V>>,
}

/// An owning iterator over the entries of a tree in ascending key order.
pub struct IntoIter<K, V> {
    stack: Vec<NodePtr<K, V>>,
    remaining: usize,
    marker: PhantomData<Box<Node<K, V>>>,
}

// The tree exclusively owns its nodes, so it is as thread safe as its contents.
unsafe impl<K: Send, V: Send> Send for AvlTree<K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for AvlTree<K, V> {}

impl<K: Ord, V> AvlTree<K, V> {
    /// Creates an empty tree.
    /// No memory is allocated until the first item is inserted.
    pub fn new() -> Self {
        Self {
            root: None,
            num_nodes: 0,
            marker: PhantomData,
        }
    }

    /// Returns a reference to the value corresponding to the key,
    /// or `None` if the key is not present.
    ///
    /// The key may be any borrowed form of the tree's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key)
            .map(|node_ptr| &unsafe { &*node_ptr.as_ptr() }.value)
    }

    /// Returns references to the key-value pair corresponding to the key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|node_ptr| {
            let node = unsafe { &*node_ptr.as_ptr() };
            (&node.key, &node.value)
        })
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key)
            .map(|node_ptr| &mut unsafe { &mut *node_ptr.as_ptr() }.value)
    }

    /// Returns true if the tree contains the key.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Returns the smallest key in the tree.
    pub fn min(&self) -> Result<&K, EmptyTreeError> {
        let mut node_ptr = self.root.ok_or(EmptyTreeError)?;
        while let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
            node_ptr = left_ptr;
        }
        Ok(&unsafe { &*node_ptr.as_ptr() }.key)
    }

    /// Returns the largest key in the tree.
    pub fn max(&self) -> Result<&K, EmptyTreeError> {
        let mut node_ptr = self.root.ok_or(EmptyTreeError)?;
        while let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
            node_ptr = right_ptr;
        }
        Ok(&unsafe { &*node_ptr.as_ptr() }.key)
    }

    /// Inserts a key-value pair into the tree.
    ///
    /// Returns false and leaves the tree unchanged if the key is already
    /// present; the value stored first for a key is kept and `value` is dropped.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let (root, _, inserted) = Self::insert_node(self.root, key, move || value);
        self.root = Some(root);
        if inserted {
            self.num_nodes += 1;
        }
        inserted
    }

    /// Returns a mutable reference to the value at the key,
    /// inserting the value produced by `default` first if the key is absent.
    ///
    /// ```
    /// use avl_concordance::AvlTree;
    /// let mut counts = AvlTree::new();
    /// for word in ["b", "a", "b"] {
    ///     *counts.get_or_insert_with(word, || 0) += 1;
    /// }
    /// assert_eq!(counts.get("b"), Some(&2));
    /// ```
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let (root, target_ptr, inserted) = Self::insert_node(self.root, key, default);
        self.root = Some(root);
        if inserted {
            self.num_nodes += 1;
        }
        // Rotations relink nodes but never move or free them.
        &mut unsafe { &mut *target_ptr.as_ptr() }.value
    }

    /// Removes a key from the tree.
    /// Returns the value at the key if the key was previously in the tree.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key from the tree.
    /// Returns the stored key and value if the key was previously in the tree.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (root, removed) = Self::remove_node(self.root, key);
        self.root = root;
        if removed.is_some() {
            debug_assert!(self.num_nodes >= 1);
            self.num_nodes -= 1;
        }
        removed
    }

    /// Asserts that the tree is ordered, balanced, and that every cached
    /// height and the node count are accurate.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        let num_nodes = Self::check_subtree(self.root, None, None);
        assert_eq!(num_nodes, self.num_nodes);
    }

    #[cfg(any(test, feature = "consistency_check"))]
    fn check_subtree(link: Link<K, V>, lower: Option<&K>, upper: Option<&K>) -> usize {
        let node_ptr = match link {
            None => return 0,
            Some(node_ptr) => node_ptr,
        };
        let node = unsafe { &*node_ptr.as_ptr() };

        // Check search order against all ancestors
        if let Some(lower) = lower {
            assert!(node.key > *lower);
        }
        if let Some(upper) = upper {
            assert!(node.key < *upper);
        }

        let left_count = Self::check_subtree(node.left, lower, Some(&node.key));
        let right_count = Self::check_subtree(node.right, Some(&node.key), upper);

        // Check height
        let left_height = Self::height(node.left);
        let right_height = Self::height(node.right);
        assert_eq!(node.height, 1 + cmp::max(left_height, right_height));

        // Check AVL condition (nearly balance)
        assert!((left_height - right_height).abs() <= ALLOWED_IMBALANCE);

        left_count + right_count + 1
    }

    fn find<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            current = unsafe {
                match key.cmp(node_ptr.as_ref().key.borrow()) {
                    Ordering::Equal => break,
                    Ordering::Less => node_ptr.as_ref().left,
                    Ordering::Greater => node_ptr.as_ref().right,
                }
            }
        }
        current
    }

    /// Inserts below `link` unless the key is present.
    /// Returns the new subtree root, the node holding the key and whether it was created.
    fn insert_node<F>(link: Link<K, V>, key: K, make_value: F) -> (NodePtr<K, V>, NodePtr<K, V>, bool)
    where
        F: FnOnce() -> V,
    {
        let mut node_ptr = match link {
            None => {
                let node_ptr = Node::create(key, make_value());
                trace!("create leaf");
                return (node_ptr, node_ptr, true);
            }
            Some(node_ptr) => node_ptr,
        };
        unsafe {
            let (target_ptr, inserted) = match key.cmp(&node_ptr.as_ref().key) {
                Ordering::Equal => return (node_ptr, node_ptr, false),
                Ordering::Less => {
                    let (left_ptr, target_ptr, inserted) =
                        Self::insert_node(node_ptr.as_ref().left, key, make_value);
                    node_ptr.as_mut().left = Some(left_ptr);
                    (target_ptr, inserted)
                }
                Ordering::Greater => {
                    let (right_ptr, target_ptr, inserted) =
                        Self::insert_node(node_ptr.as_ref().right, key, make_value);
                    node_ptr.as_mut().right = Some(right_ptr);
                    (target_ptr, inserted)
                }
            };
            (Self::balance(node_ptr), target_ptr, inserted)
        }
    }

    /// Removes the key from below `link`.
    /// Returns the new subtree root and the removed entry.
    fn remove_node<Q>(link: Link<K, V>, key: &Q) -> (Link<K, V>, Option<(K, V)>)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node_ptr = match link {
            None => return (None, None),
            Some(node_ptr) => node_ptr,
        };
        unsafe {
            let removed = match key.cmp(node_ptr.as_ref().key.borrow()) {
                Ordering::Less => {
                    let (left, removed) = Self::remove_node(node_ptr.as_ref().left, key);
                    node_ptr.as_mut().left = left;
                    removed
                }
                Ordering::Greater => {
                    let (right, removed) = Self::remove_node(node_ptr.as_ref().right, key);
                    node_ptr.as_mut().right = right;
                    removed
                }
                Ordering::Equal => match (node_ptr.as_ref().left, node_ptr.as_ref().right) {
                    (Some(_), Some(right_ptr)) => {
                        // Two children: the in-order successor's entry moves into this node
                        let (right, (successor_key, successor_value)) = Self::remove_min(right_ptr);
                        let node = node_ptr.as_mut();
                        node.right = right;
                        let removed_key = mem::replace(&mut node.key, successor_key);
                        let removed_value = mem::replace(&mut node.value, successor_value);
                        Some((removed_key, removed_value))
                    }
                    (left, right) => {
                        // Stem or leaf: replaced by its only child, if any
                        trace!("unlink node");
                        return (left.or(right), Some(Node::destroy(node_ptr)));
                    }
                },
            };
            (Some(Self::balance(node_ptr)), removed)
        }
    }

    /// Unlinks the leftmost node of the subtree rooted at `node_ptr`.
    /// Returns the new subtree root and the unlinked entry.
    fn remove_min(mut node_ptr: NodePtr<K, V>) -> (Link<K, V>, (K, V)) {
        unsafe {
            match node_ptr.as_ref().left {
                None => {
                    let right = node_ptr.as_ref().right;
                    trace!("unlink successor");
                    (right, Node::destroy(node_ptr))
                }
                Some(left_ptr) => {
                    let (left, min) = Self::remove_min(left_ptr);
                    node_ptr.as_mut().left = left;
                    (Some(Self::balance(node_ptr)), min)
                }
            }
        }
    }

    fn height(link: Link<K, V>) -> isize {
        match link {
            None => -1,
            Some(node_ptr) => unsafe { node_ptr.as_ref().height },
        }
    }

    fn adjust_height(mut node_ptr: NodePtr<K, V>) {
        unsafe {
            let height = 1 + cmp::max(
                Self::height(node_ptr.as_ref().left),
                Self::height(node_ptr.as_ref().right),
            );
            node_ptr.as_mut().height = height;
        }
    }

    /// Rotates the subtree left; the right child becomes the new subtree root.
    fn rotate_left(mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        unsafe {
            match node_ptr.as_ref().right {
                None => node_ptr,
                Some(mut right_ptr) => {
                    node_ptr.as_mut().right = right_ptr.as_ref().left;
                    right_ptr.as_mut().left = Some(node_ptr);
                    Self::adjust_height(node_ptr);
                    Self::adjust_height(right_ptr);
                    trace!(height = right_ptr.as_ref().height, "rotate left");
                    right_ptr
                }
            }
        }
    }

    /// Rotates the subtree right; the left child becomes the new subtree root.
    fn rotate_right(mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        unsafe {
            match node_ptr.as_ref().left {
                None => node_ptr,
                Some(mut left_ptr) => {
                    node_ptr.as_mut().left = left_ptr.as_ref().right;
                    left_ptr.as_mut().right = Some(node_ptr);
                    Self::adjust_height(node_ptr);
                    Self::adjust_height(left_ptr);
                    trace!(height = left_ptr.as_ref().height, "rotate right");
                    left_ptr
                }
            }
        }
    }

    /// Restores the AVL condition at the given node if necessary and adjusts its height.
    /// Returns the root of the rebalanced subtree.
    ///
    /// A single rotation is preferred whenever the outer grandchild subtree is at
    /// least as tall as the inner one.
    fn balance(mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        unsafe {
            let left = node_ptr.as_ref().left;
            let right = node_ptr.as_ref().right;
            let balance_factor = Self::height(left) - Self::height(right);
            debug_assert!(balance_factor.abs() <= ALLOWED_IMBALANCE + 1);

            if balance_factor > ALLOWED_IMBALANCE {
                if let Some(left_ptr) = left {
                    if Self::height(left_ptr.as_ref().left) < Self::height(left_ptr.as_ref().right) {
                        node_ptr.as_mut().left = Some(Self::rotate_left(left_ptr));
                    }
                }
                Self::rotate_right(node_ptr)
            } else if balance_factor < -ALLOWED_IMBALANCE {
                if let Some(right_ptr) = right {
                    if Self::height(right_ptr.as_ref().right) < Self::height(right_ptr.as_ref().left) {
                        node_ptr.as_mut().right = Some(Self::rotate_right(right_ptr));
                    }
                }
                Self::rotate_left(node_ptr)
            } else {
                Self::adjust_height(node_ptr);
                node_ptr
            }
        }
    }
}

impl<K, V> AvlTree<K, V> {
    /// Returns true if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of elements in the tree.
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Returns the height of the tree: 0 for a single node, -1 when empty.
    #[cfg(test)]
    pub(crate) fn height_of_root(&self) -> isize {
        match self.root {
            None => -1,
            Some(root_ptr) => unsafe { root_ptr.as_ref().height },
        }
    }

    /// Returns the keys in pre-order, which pins down the shape of the tree.
    #[cfg(test)]
    pub(crate) fn preorder_keys(&self) -> Vec<&K> {
        fn visit<'a, K, V>(link: Link<K, V>, keys: &mut Vec<&'a K>) {
            if let Some(node_ptr) = link {
                let node = unsafe { &*node_ptr.as_ptr() };
                keys.push(&node.key);
                visit(node.left, keys);
                visit(node.right, keys);
            }
        }
        let mut keys = Vec::with_capacity(self.num_nodes);
        visit(self.root, &mut keys);
        keys
    }

    /// Clears the tree, deallocating all memory.
    pub fn clear(&mut self) {
        let root = self.root.take();
        self.num_nodes = 0;
        Self::destroy_subtree(root);
    }

    /// Gets an iterator over the entries of the tree in ascending key order.
    ///
    /// Every call starts a fresh traversal from the smallest key.
    pub fn in_order(&self) -> Iter<'_, K, V> {
        Iter::new(self.root, self.num_nodes)
    }

    fn destroy_subtree(link: Link<K, V>) {
        if let Some(node_ptr) = link {
            let node = unsafe { Box::from_raw(node_ptr.as_ptr()) };
            Self::destroy_subtree(node.left);
            Self::destroy_subtree(node.right);
        }
    }
}

impl<K: Clone, V: Clone> AvlTree<K, V> {
    fn clone_subtree(link: Link<K, V>) -> Link<K, V> {
        link.map(|node_ptr| {
            let node = unsafe { node_ptr.as_ref() };
            let mut clone_ptr = Node::create(node.key.clone(), node.value.clone());
            unsafe {
                let clone = clone_ptr.as_mut();
                clone.left = Self::clone_subtree(node.left);
                clone.right = Self::clone_subtree(node.right);
                clone.height = node.height;
            }
            clone_ptr
        })
    }
}

impl<K, V> Drop for AvlTree<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: Ord, V> Default for AvlTree<K, V> {
    /// Creates an empty tree.
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for AvlTree<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: Self::clone_subtree(self.root),
            num_nodes: self.num_nodes,
            marker: PhantomData,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.in_order()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a AvlTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.in_order()
    }
}

impl<K, V> IntoIterator for AvlTree<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;
    fn into_iter(mut self) -> Self::IntoIter {
        let root = self.root.take();
        let remaining = mem::take(&mut self.num_nodes);
        IntoIter::new(root, remaining)
    }
}

impl<K, V> Node<K, V> {
    fn create(key: K, value: V) -> NodePtr<K, V> {
        let boxed = Box::new(Node {
            key,
            value,
            left: None,
            right: None,
            height: 0,
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }

    /// Frees a node that has already been unlinked from the tree.
    /// Its children are left untouched.
    unsafe fn destroy(node_ptr: NodePtr<K, V>) -> (K, V) {
        let Node { key, value, .. } = *Box::from_raw(node_ptr.as_ptr());
        (key, value)
    }
}

impl<'a, K, V> Iter<'a, K, V> {
    fn new(root: Link<K, V>, remaining: usize) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            remaining,
            marker: PhantomData,
        };
        iter.push_left_spine(root);
        iter
    }

    fn push_left_spine(&mut self, mut link: Link<K, V>) {
        while let Some(node_ptr) = link {
            self.stack.push(node_ptr);
            link = unsafe { node_ptr.as_ref().left };
        }
    }
}

// Auto derived clone seems to have an invalid type bound of K: Clone, V: Clone
impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            remaining: self.remaining,
            marker: PhantomData,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.stack.pop()?;
        let node = unsafe { &*node_ptr.as_ptr() };
        self.push_left_spine(node.right);
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> IntoIter<K, V> {
    fn new(root: Link<K, V>, remaining: usize) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            remaining,
            marker: PhantomData,
        };
        iter.push_left_spine(root);
        iter
    }

    fn push_left_spine(&mut self, mut link: Link<K, V>) {
        while let Some(node_ptr) = link {
            self.stack.push(node_ptr);
            link = unsafe { node_ptr.as_ref().left };
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.stack.pop()?;
        // The left subtree has already been yielded and freed; only the right one is still owned.
        let right = unsafe { node_ptr.as_ref().right };
        self.push_left_spine(right);
        self.remaining -= 1;
        Some(unsafe { Node::destroy(node_ptr) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K, V> Drop for IntoIter<K, V> {
    fn drop(&mut self) {
        for _ in self.by_ref() {}
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for IntoIter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let iter = Iter {
            stack: self.stack.clone(),
            remaining: self.remaining,
            marker: PhantomData,
        };
        f.debug_list().entries(iter).finish()
    }
}
