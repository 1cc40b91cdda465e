//! An intrusive red-black tree
//!
//! The tree never owns or allocates nodes. Every operation receives a
//! [`NodeStore`], which maps a [`NodeRef`] to the [`Node`] it names, so the
//! same balancing code runs over a plain slice of nodes ([`SliceStore`]) or
//! over nodes that live inside the free blocks of a memory pool
//! ([`crate::FreeList`]).
//!
//! ```rust
//! use rfreelist::rbtree::{NaturalOrder, Node, NodeStore, RbTree, SliceStore};
//!
//! let mut nodes = [Node::new(3), Node::new(1), Node::new(3)];
//! let mut store = SliceStore::new(&mut nodes);
//!
//! // `true`: equal keys are allowed
//! let mut tree: RbTree<i32, NaturalOrder, true> = RbTree::new();
//! for i in 0..3 {
//!     tree.insert(&mut store, SliceStore::<i32>::node_ref(i)).unwrap();
//! }
//!
//! let at_least_2 = tree.lower_bound(&store, &2).unwrap();
//! assert_eq!(*store.node(at_least_2).key(), 3);
//! assert_eq!(tree.len(), 3);
//! ```
use core::{fmt, marker::PhantomData, num::NonZeroUsize};

use crate::tagged::TaggedWord;

/// A reference to a node held by a [`NodeStore`].
///
/// The raw value is non-zero and even. The low bit is reused to store the
/// color of the node that points to its parent through this reference.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef(NonZeroUsize);

impl NodeRef {
    /// Construct a `NodeRef`. Returns `None` if `raw` is zero or odd.
    #[inline]
    pub const fn new(raw: usize) -> Option<Self> {
        if raw & 1 != 0 {
            return None;
        }
        match NonZeroUsize::new(raw) {
            Some(x) => Some(Self(x)),
            None => None,
        }
    }

    /// Get the raw value.
    #[inline]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({:#x})", self.get())
    }
}

/// The color of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

/// Index of the left child in [`Node::children`]. The right child is at
/// `1 - LEFT`; every mirrored routine is written in terms of `dir` and
/// `1 - dir`.
const LEFT: usize = 0;
const RIGHT: usize = 1;

/// A tree node.
#[repr(C)]
#[derive(Debug, Clone)]
pub struct Node<K> {
    /// The parent's [`NodeRef`] (0 for the root), with the color in bit 0
    /// (set = black).
    parent_and_color: TaggedWord,
    children: [Option<NodeRef>; 2],
    key: K,
}

impl<K> Node<K> {
    /// Construct an unlinked red node.
    #[inline]
    pub const fn new(key: K) -> Self {
        Self {
            parent_and_color: TaggedWord::new(0, false),
            children: [None, None],
            key,
        }
    }

    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeRef> {
        NodeRef::new(self.parent_and_color.value())
    }

    #[inline]
    pub fn color(&self) -> Color {
        if self.parent_and_color.flag() {
            Color::Black
        } else {
            Color::Red
        }
    }

    #[inline]
    pub fn left(&self) -> Option<NodeRef> {
        self.children[LEFT]
    }

    #[inline]
    pub fn right(&self) -> Option<NodeRef> {
        self.children[RIGHT]
    }

    #[inline]
    fn set_parent(&mut self, parent: Option<NodeRef>) {
        self.parent_and_color
            .set_value(parent.map_or(0, NodeRef::get));
    }

    #[inline]
    fn set_color(&mut self, color: Color) {
        self.parent_and_color.set_flag(color == Color::Black);
    }

    /// Forget all links and become an unlinked red node.
    #[inline]
    fn unlink(&mut self) {
        self.parent_and_color = TaggedWord::new(0, false);
        self.children = [None, None];
    }
}

/// Maps [`NodeRef`]s to [`Node`]s.
///
/// Implementations must keep returning the same node for a given `NodeRef`
/// while that node is linked into a tree.
pub trait NodeStore<K> {
    fn node(&self, at: NodeRef) -> &Node<K>;
    fn node_mut(&mut self, at: NodeRef) -> &mut Node<K>;
}

/// A [`NodeStore`] over a caller-provided slice of nodes.
///
/// The node at index `i` is named by [`SliceStore::node_ref`]`(i)`.
#[derive(Debug)]
pub struct SliceStore<'a, K> {
    nodes: &'a mut [Node<K>],
}

impl<'a, K> SliceStore<'a, K> {
    #[inline]
    pub fn new(nodes: &'a mut [Node<K>]) -> Self {
        Self { nodes }
    }

    /// The [`NodeRef`] naming `nodes[index]`.
    #[inline]
    pub fn node_ref(index: usize) -> NodeRef {
        match index
            .checked_add(1)
            .and_then(|x| x.checked_mul(2))
            .and_then(NodeRef::new)
        {
            Some(x) => x,
            None => panic!("node index {} is out of range", index),
        }
    }

    /// The slice index named by `at`.
    #[inline]
    pub fn index_of(at: NodeRef) -> usize {
        at.get() / 2 - 1
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<K> NodeStore<K> for SliceStore<'_, K> {
    #[inline]
    fn node(&self, at: NodeRef) -> &Node<K> {
        &self.nodes[Self::index_of(at)]
    }

    #[inline]
    fn node_mut(&mut self, at: NodeRef) -> &mut Node<K> {
        &mut self.nodes[Self::index_of(at)]
    }
}

/// A strict weak ordering over `K`.
///
/// Two keys are equal when neither is less than the other.
pub trait Compare<K: ?Sized> {
    fn less(a: &K, b: &K) -> bool;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Compare<K> for NaturalOrder {
    #[inline]
    fn less(a: &K, b: &K) -> bool {
        a < b
    }
}

/// An intrusive red-black tree ordered by `C`.
///
/// With `MULTISET = true`, equal keys are accepted and are placed to the
/// right of the existing ones.
pub struct RbTree<K, C = NaturalOrder, const MULTISET: bool = false> {
    root: Option<NodeRef>,
    len: usize,
    _phantom: PhantomData<fn() -> (K, C)>,
}

impl<K, C, const MULTISET: bool> fmt::Debug for RbTree<K, C, MULTISET> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RbTree")
            .field("root", &self.root)
            .field("len", &self.len)
            .finish()
    }
}

impl<K, C: Compare<K>, const MULTISET: bool> Default for RbTree<K, C, MULTISET> {
    fn default() -> Self {
        Self::INIT
    }
}

#[inline]
fn present(link: Option<NodeRef>) -> NodeRef {
    match link {
        Some(x) => x,
        None => unreachable!("red-black tree link unexpectedly absent"),
    }
}

impl<K, C: Compare<K>, const MULTISET: bool> RbTree<K, C, MULTISET> {
    /// An empty tree.
    pub const INIT: Self = Self {
        root: None,
        len: 0,
        _phantom: PhantomData,
    };

    #[inline]
    pub const fn new() -> Self {
        Self::INIT
    }

    #[inline]
    pub fn root(&self) -> Option<NodeRef> {
        self.root
    }

    /// The number of linked nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Forget every node. The nodes themselves are left as they are.
    #[inline]
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Find a node whose key is equal to `key`. If there are several, any of
    /// them may be returned.
    pub fn search<S: NodeStore<K>>(&self, store: &S, key: &K) -> Option<NodeRef> {
        let mut cur = self.root;
        while let Some(n) = cur {
            let node = store.node(n);
            if C::less(key, &node.key) {
                cur = node.children[LEFT];
            } else if C::less(&node.key, key) {
                cur = node.children[RIGHT];
            } else {
                return Some(n);
            }
        }
        None
    }

    #[inline]
    pub fn contains<S: NodeStore<K>>(&self, store: &S, key: &K) -> bool {
        self.search(store, key).is_some()
    }

    /// Find the leftmost node whose key is not less than `key`.
    pub fn lower_bound<S: NodeStore<K>>(&self, store: &S, key: &K) -> Option<NodeRef> {
        let mut best = None;
        let mut cur = self.root;
        while let Some(n) = cur {
            let node = store.node(n);
            if C::less(&node.key, key) {
                cur = node.children[RIGHT];
            } else {
                // Sufficient; look for something smaller
                best = Some(n);
                cur = node.children[LEFT];
            }
        }
        best
    }

    /// The node with the smallest key.
    #[inline]
    pub fn first<S: NodeStore<K>>(&self, store: &S) -> Option<NodeRef> {
        self.root.map(|n| Self::leftmost(store, n))
    }

    /// The in-order successor of `node`.
    pub fn successor<S: NodeStore<K>>(&self, store: &S, node: NodeRef) -> Option<NodeRef> {
        if let Some(right) = store.node(node).children[RIGHT] {
            return Some(Self::leftmost(store, right));
        }

        let mut n = node;
        while let Some(p) = store.node(n).parent() {
            if store.node(p).children[LEFT] == Some(n) {
                return Some(p);
            }
            n = p;
        }
        None
    }

    /// Iterate over the nodes in key order.
    #[inline]
    pub fn iter<'a, S: NodeStore<K>>(&'a self, store: &'a S) -> Iter<'a, K, C, S, MULTISET> {
        Iter {
            tree: self,
            store,
            next: self.first(store),
        }
    }

    /// Absent nodes are black.
    #[inline]
    fn is_red<S: NodeStore<K>>(store: &S, link: Option<NodeRef>) -> bool {
        link.map_or(false, |n| store.node(n).color() == Color::Red)
    }

    #[inline]
    fn leftmost<S: NodeStore<K>>(store: &S, mut n: NodeRef) -> NodeRef {
        while let Some(left) = store.node(n).children[LEFT] {
            n = left;
        }
        n
    }

    /// Which side of its parent `n` hangs on. `n` must not be the root.
    #[inline]
    fn child_dir<S: NodeStore<K>>(store: &S, n: NodeRef) -> usize {
        let p = present(store.node(n).parent());
        if store.node(p).children[LEFT] == Some(n) {
            LEFT
        } else {
            RIGHT
        }
    }

    /// Make `new` take `old`'s slot in `parent` (or the root slot).
    #[inline]
    fn replace_child<S: NodeStore<K>>(
        &mut self,
        store: &mut S,
        parent: Option<NodeRef>,
        old: NodeRef,
        new: Option<NodeRef>,
    ) {
        match parent {
            None => self.root = new,
            Some(p) => {
                let dir = if store.node(p).children[LEFT] == Some(old) {
                    LEFT
                } else {
                    RIGHT
                };
                store.node_mut(p).children[dir] = new;
            }
        }
    }

    /// Put the subtree `new` where the subtree `old` was. `old`'s children
    /// are not moved.
    fn transplant<S: NodeStore<K>>(&mut self, store: &mut S, old: NodeRef, new: Option<NodeRef>) {
        let parent = store.node(old).parent();
        self.replace_child(store, parent, old, new);
        if let Some(new) = new {
            store.node_mut(new).set_parent(parent);
        }
    }

    /// Rotate the subtree rooted at `p` toward `dir` (`LEFT` or `RIGHT`).
    /// `p`'s child on the opposite side becomes the new subtree root, which
    /// is returned.
    ///
    /// ```text
    ///   rotate(p, RIGHT)            rotate(p, LEFT)
    ///
    ///        p           s             p              s
    ///       / \         / \           / \            / \
    ///      s   t  -->  .   p         t   s    -->   p   .
    ///     / \             / \           / \        / \
    ///    .   c           c   t         c   .      t   c
    /// ```
    fn rotate<S: NodeStore<K>>(&mut self, store: &mut S, p: NodeRef, dir: usize) -> NodeRef {
        let g = store.node(p).parent();
        let s = present(store.node(p).children[1 - dir]);
        let c = store.node(s).children[dir];

        store.node_mut(p).children[1 - dir] = c;
        if let Some(c) = c {
            store.node_mut(c).set_parent(Some(p));
        }

        store.node_mut(s).children[dir] = Some(p);
        store.node_mut(p).set_parent(Some(s));

        store.node_mut(s).set_parent(g);
        self.replace_child(store, g, p, Some(s));

        s
    }

    /// Link `node` into the tree.
    ///
    /// `node` must not be linked into any tree. Its previous links and color
    /// are overwritten.
    ///
    /// In set mode (`MULTISET = false`), returns `Err` with the existing
    /// node if one has an equal key; the tree is left unchanged. In multiset
    /// mode this method always succeeds.
    pub fn insert<S: NodeStore<K>>(&mut self, store: &mut S, node: NodeRef) -> Result<(), NodeRef> {
        let mut parent = None;
        let mut dir = LEFT;
        let mut cur = self.root;

        while let Some(c) = cur {
            let (key, c_key) = (&store.node(node).key, &store.node(c).key);
            if C::less(key, c_key) {
                dir = LEFT;
            } else {
                if !MULTISET && !C::less(c_key, key) {
                    return Err(c);
                }
                // Ties go right
                dir = RIGHT;
            }
            parent = Some(c);
            cur = store.node(c).children[dir];
        }

        {
            let n = store.node_mut(node);
            n.unlink();
            n.set_parent(parent);
        }

        match parent {
            None => self.root = Some(node),
            Some(p) => {
                store.node_mut(p).children[dir] = Some(node);
                self.insert_fixup(store, node);
            }
        }

        store.node_mut(present(self.root)).set_color(Color::Black);
        self.len += 1;
        Ok(())
    }

    /// Resolve red-red violations above the newly linked red node `n`.
    fn insert_fixup<S: NodeStore<K>>(&mut self, store: &mut S, mut n: NodeRef) {
        debug_assert_eq!(store.node(n).color(), Color::Red);

        while let Some(mut p) = store.node(n).parent() {
            if !Self::is_red(&*store, Some(p)) {
                return;
            }

            let g = match store.node(p).parent() {
                Some(g) => g,
                None => {
                    // `p` is a red root
                    store.node_mut(p).set_color(Color::Black);
                    return;
                }
            };

            let dir = Self::child_dir(store, p);
            let u = store.node(g).children[1 - dir];

            if !Self::is_red(&*store, u) {
                if store.node(p).children[1 - dir] == Some(n) {
                    // Inner grandchild; straighten the zig-zag first
                    self.rotate(store, p, dir);
                    p = present(store.node(g).children[dir]);
                }
                store.node_mut(p).set_color(Color::Black);
                store.node_mut(g).set_color(Color::Red);
                self.rotate(store, g, 1 - dir);
                return;
            }

            // Red uncle: push the blackness down from `g` and continue above
            store.node_mut(p).set_color(Color::Black);
            store.node_mut(present(u)).set_color(Color::Black);
            store.node_mut(g).set_color(Color::Red);
            n = g;
        }
    }

    /// Unlink `node` from the tree and return it with its links cleared.
    ///
    /// `node` must be linked into `self`. Other nodes keep their identity:
    /// when `node` has two children, its in-order successor is moved into
    /// its position rather than having keys swapped.
    pub fn delete<S: NodeStore<K>>(&mut self, store: &mut S, node: NodeRef) -> NodeRef {
        let left = store.node(node).children[LEFT];
        let right = store.node(node).children[RIGHT];

        // `x` is the subtree that moved into the vacated position and
        // `x_parent` its parent; `x` may be absent.
        let (x, x_parent, removed_color);

        match (left, right) {
            (Some(l), Some(r)) => {
                let y = Self::leftmost(store, r);
                removed_color = store.node(y).color();
                x = store.node(y).children[RIGHT];

                if y == r {
                    x_parent = Some(y);
                } else {
                    x_parent = store.node(y).parent();
                    self.transplant(store, y, x);
                    store.node_mut(y).children[RIGHT] = Some(r);
                    store.node_mut(r).set_parent(Some(y));
                }

                self.transplant(store, node, Some(y));
                store.node_mut(y).children[LEFT] = Some(l);
                store.node_mut(l).set_parent(Some(y));
                let color = store.node(node).color();
                store.node_mut(y).set_color(color);
            }
            _ => {
                removed_color = store.node(node).color();
                x = left.or(right);
                x_parent = store.node(node).parent();
                self.transplant(store, node, x);
            }
        }

        if removed_color == Color::Black {
            self.delete_fixup(store, x, x_parent);
        }

        store.node_mut(node).unlink();
        self.len -= 1;
        node
    }

    /// Restore the black height after a black node was removed above `x`,
    /// whose paths are now one black node short.
    fn delete_fixup<S: NodeStore<K>>(
        &mut self,
        store: &mut S,
        mut x: Option<NodeRef>,
        mut parent: Option<NodeRef>,
    ) {
        while x != self.root && !Self::is_red(&*store, x) {
            let p = match parent {
                Some(p) => p,
                None => break,
            };

            let dir = if store.node(p).children[LEFT] == x {
                LEFT
            } else {
                RIGHT
            };

            // The sibling must exist because its side is one black node taller
            let mut s = present(store.node(p).children[1 - dir]);

            if Self::is_red(&*store, Some(s)) {
                // Red sibling: rotate it above `p` so that `x` gets a black
                // sibling
                store.node_mut(s).set_color(Color::Black);
                store.node_mut(p).set_color(Color::Red);
                self.rotate(store, p, dir);
                s = present(store.node(p).children[1 - dir]);
            }

            let close = store.node(s).children[dir];
            let distant = store.node(s).children[1 - dir];

            if !Self::is_red(&*store, close) && !Self::is_red(&*store, distant) {
                // No red nephew: take one black off the sibling's side and
                // move the deficiency up. A red `p` ends the loop and is
                // painted black below.
                store.node_mut(s).set_color(Color::Red);
                x = Some(p);
                parent = store.node(p).parent();
                continue;
            }

            if !Self::is_red(&*store, distant) {
                // Close nephew red, distant black: rotate the close nephew
                // into the sibling position
                store.node_mut(present(close)).set_color(Color::Black);
                store.node_mut(s).set_color(Color::Red);
                self.rotate(store, s, 1 - dir);
                s = present(store.node(p).children[1 - dir]);
            }

            // Distant nephew red
            let p_color = store.node(p).color();
            store.node_mut(s).set_color(p_color);
            store.node_mut(p).set_color(Color::Black);
            let distant = present(store.node(s).children[1 - dir]);
            store.node_mut(distant).set_color(Color::Black);
            self.rotate(store, p, dir);
            x = self.root;
            break;
        }

        if let Some(x) = x {
            store.node_mut(x).set_color(Color::Black);
        }
    }

    /// Check the tree's structural invariants and return its black height.
    #[cfg(test)]
    pub(crate) fn validate<S: NodeStore<K>>(&self, store: &S) -> usize {
        let root = match self.root {
            Some(root) => root,
            None => {
                assert_eq!(self.len, 0);
                return 1;
            }
        };
        assert_eq!(store.node(root).parent(), None, "the root has a parent");
        assert_eq!(store.node(root).color(), Color::Black, "the root is red");

        let mut count = 0;
        let black_height = Self::validate_subtree(store, root, &mut count);
        assert_eq!(count, self.len, "`len` disagrees with the node count");

        // In-order keys are non-decreasing (and increasing in set mode)
        let mut it = self.iter(store);
        if let Some(mut prev) = it.next() {
            for n in it {
                let (a, b) = (&store.node(prev).key, &store.node(n).key);
                assert!(!C::less(b, a), "keys are out of order");
                if !MULTISET {
                    assert!(C::less(a, b), "duplicate key in set mode");
                }
                prev = n;
            }
        }

        black_height
    }

    #[cfg(test)]
    fn validate_subtree<S: NodeStore<K>>(store: &S, n: NodeRef, count: &mut usize) -> usize {
        *count += 1;
        let node = store.node(n);
        let mut heights = [1; 2];
        for dir in [LEFT, RIGHT] {
            if let Some(c) = node.children[dir] {
                assert_eq!(store.node(c).parent(), Some(n), "broken parent link");
                if node.color() == Color::Red {
                    assert_eq!(store.node(c).color(), Color::Black, "red node has a red child");
                }
                heights[dir] = Self::validate_subtree(store, c, count);
            }
        }
        assert_eq!(heights[LEFT], heights[RIGHT], "unequal black heights");
        heights[LEFT] + (node.color() == Color::Black) as usize
    }
}

/// An in-order iterator over the nodes of an [`RbTree`].
pub struct Iter<'a, K, C, S, const MULTISET: bool> {
    tree: &'a RbTree<K, C, MULTISET>,
    store: &'a S,
    next: Option<NodeRef>,
}

impl<K, C: Compare<K>, S: NodeStore<K>, const MULTISET: bool> Iterator
    for Iter<'_, K, C, S, MULTISET>
{
    type Item = NodeRef;

    #[inline]
    fn next(&mut self) -> Option<NodeRef> {
        let n = self.next?;
        self.next = self.tree.successor(self.store, n);
        Some(n)
    }
}
