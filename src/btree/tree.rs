//! # Copy-on-Write B+Tree
//!
//! Ordered byte-string map over fixed-size pages. The tree never mutates a
//! stored page: an insert rebuilds every node on the root-to-leaf path into
//! fresh pages and hands the old ones back to the page store. Readers that
//! hold the previous root keep a consistent view, and a crash between
//! flushes leaves the old tree intact.
//!
//! ## Page Capabilities
//!
//! The tree does not own pages. It reaches them through the [`PageStore`]
//! trait:
//!
//! ```text
//! page_get(ptr) -> BNode    dereference a page id
//! page_new(node) -> ptr     allocate a page for a finalized node
//! page_del(ptr)             release a page (reclamation is store policy)
//! ```
//!
//! The pager implements this over the mmap'd file; unit tests drive the
//! same algorithms over a plain in-memory page vector.
//!
//! ## Insert Shape
//!
//! ```text
//! 1. Rebuild the leaf into a double-size scratch node.
//! 2. split3: cut the scratch into 1..=3 right-sized nodes.
//! 3. Parent replaces the child entry with the split results, itself
//!    rebuilt into a scratch node, and so on up to the root.
//! 4. If the root splits, a new internal root adopts the pieces; this is
//!    the only place tree height grows.
//! ```
//!
//! ## The Dummy Key
//!
//! The very first insert writes a leaf whose entry 0 is the empty key.
//! Every descent can therefore find a containing child without a boundary
//! case: `lookup_le` always has an entry `<=` the search key.

use smallvec::SmallVec;

use super::node::{BNode, NodeType};
use crate::config::{MAX_KEY_SIZE, MAX_VAL_SIZE, PAGE_SIZE};

/// Page capabilities the tree is built over.
pub trait PageStore {
    /// Dereferences a page id. Panics on an id the store never handed out;
    /// that is a tree bug, not an I/O condition.
    fn page_get(&self, ptr: u64) -> BNode;

    /// Allocates a page id for a finalized node.
    fn page_new(&mut self, node: BNode) -> u64;

    /// Releases a page. Stores may treat this as a no-op.
    fn page_del(&mut self, ptr: u64);
}

/// B+tree handle: just the root page id. Page id 0 doubles as "empty tree"
/// because page 0 of the backing file is reserved for the master page.
#[derive(Debug, Clone, Copy, Default)]
pub struct BTree {
    pub root: u64,
}

impl BTree {
    pub fn new(root: u64) -> Self {
        Self { root }
    }

    /// Point lookup. Returns the stored value, or `None` when absent.
    pub fn get(&self, store: &dyn PageStore, key: &[u8]) -> Option<Vec<u8>> {
        if self.root == 0 {
            return None;
        }
        let mut node = store.page_get(self.root);
        loop {
            let idx = node.lookup_le(key);
            match node.node_type() {
                NodeType::Leaf => {
                    return if node.key(idx) == key {
                        Some(node.val(idx).to_vec())
                    } else {
                        None
                    };
                }
                NodeType::Internal => {
                    node = store.page_get(node.ptr(idx));
                }
            }
        }
    }

    /// In-order traversal of every stored pair. The dummy entry is
    /// skipped; callers see only user keys.
    pub fn scan(&self, store: &dyn PageStore) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut out = Vec::new();
        if self.root != 0 {
            scan_node(store, self.root, &mut out);
        }
        out
    }

    /// Inserts or updates a key. Key and value sizes are preconditions;
    /// violating them is a caller bug.
    pub fn insert(&mut self, store: &mut dyn PageStore, key: &[u8], val: &[u8]) {
        assert!(!key.is_empty(), "empty keys are reserved for the dummy");
        assert!(key.len() <= MAX_KEY_SIZE, "key too long: {}", key.len());
        assert!(val.len() <= MAX_VAL_SIZE, "value too long: {}", val.len());

        if self.root == 0 {
            // First node: the dummy entry covers the whole key space.
            let mut root = BNode::new_page();
            root.set_header(NodeType::Leaf, 2);
            root.append_kv(0, 0, &[], &[]);
            root.append_kv(1, 0, key, val);
            self.root = store.page_new(root);
            return;
        }

        let node = store.page_get(self.root);
        store.page_del(self.root);

        let node = tree_insert(store, node, key, val);
        let mut split = split3(node);
        if split.len() > 1 {
            // The root split; add a level.
            let nsplit = split.len() as u16;
            let mut root = BNode::new_page();
            root.set_header(NodeType::Internal, nsplit);
            for (i, child) in split.drain(..).enumerate() {
                let first_key = child.key(0).to_vec();
                let ptr = store.page_new(child);
                root.append_kv(i as u16, ptr, &first_key, &[]);
            }
            self.root = store.page_new(root);
        } else {
            self.root = store.page_new(split.pop().unwrap());
        }
    }
}

fn scan_node(store: &dyn PageStore, ptr: u64, out: &mut Vec<(Vec<u8>, Vec<u8>)>) {
    let node = store.page_get(ptr);
    match node.node_type() {
        NodeType::Leaf => {
            for i in 0..node.nkeys() {
                if node.key(i).is_empty() {
                    continue; // the root's dummy entry
                }
                out.push((node.key(i).to_vec(), node.val(i).to_vec()));
            }
        }
        NodeType::Internal => {
            for i in 0..node.nkeys() {
                scan_node(store, node.ptr(i), out);
            }
        }
    }
}

/// Rebuilds `node` with `key` inserted or updated. The result lives in a
/// scratch buffer and may exceed one page until split.
fn tree_insert(store: &mut dyn PageStore, node: BNode, key: &[u8], val: &[u8]) -> BNode {
    let mut new = BNode::new_scratch();
    let idx = node.lookup_le(key);
    match node.node_type() {
        NodeType::Leaf => {
            if node.key(idx) == key {
                leaf_update(&mut new, &node, idx, key, val);
            } else {
                leaf_insert(&mut new, &node, idx + 1, key, val);
            }
        }
        NodeType::Internal => {
            node_insert(store, &mut new, &node, idx, key, val);
        }
    }
    new
}

/// Inserts a new cell at `idx`, shifting the tail right.
fn leaf_insert(new: &mut BNode, old: &BNode, idx: u16, key: &[u8], val: &[u8]) {
    new.set_header(NodeType::Leaf, old.nkeys() + 1);
    new.append_range(old, 0, 0, idx);
    new.append_kv(idx, 0, key, val);
    new.append_range(old, idx + 1, idx, old.nkeys() - idx);
}

/// Replaces the cell at `idx` in place; node size class is unchanged.
fn leaf_update(new: &mut BNode, old: &BNode, idx: u16, key: &[u8], val: &[u8]) {
    new.set_header(NodeType::Leaf, old.nkeys());
    new.append_range(old, 0, 0, idx);
    new.append_kv(idx, 0, key, val);
    new.append_range(old, idx + 1, idx + 1, old.nkeys() - (idx + 1));
}

/// Descends into child `idx`, then replaces its entry with the split result.
fn node_insert(
    store: &mut dyn PageStore,
    new: &mut BNode,
    node: &BNode,
    idx: u16,
    key: &[u8],
    val: &[u8],
) {
    let kptr = node.ptr(idx);
    let knode = store.page_get(kptr);
    store.page_del(kptr);

    let knode = tree_insert(store, knode, key, val);
    let split = split3(knode);
    replace_kid_n(store, new, node, idx, split);
}

/// Rewires the parent after a child rebuild. When the child stayed whole
/// and kept its first key, only the pointer cell differs, so the parent is
/// byte-copied and patched instead of rebuilt.
fn replace_kid_n(
    store: &mut dyn PageStore,
    new: &mut BNode,
    old: &BNode,
    idx: u16,
    mut kids: SmallVec<[BNode; 3]>,
) {
    let inc = kids.len() as u16;
    if inc == 1 && kids[0].key(0) == old.key(idx) {
        new.copy_from(old);
        let ptr = store.page_new(kids.pop().unwrap());
        new.set_ptr(idx, ptr);
        return;
    }

    new.set_header(NodeType::Internal, old.nkeys() + inc - 1);
    new.append_range(old, 0, 0, idx);
    for (i, kid) in kids.drain(..).enumerate() {
        let first_key = kid.key(0).to_vec();
        let ptr = store.page_new(kid);
        new.append_kv(idx + i as u16, ptr, &first_key, &[]);
    }
    new.append_range(old, idx + inc, idx + 1, old.nkeys() - (idx + 1));
}

/// Cuts an oversized node into two. The right half always fits a page; the
/// left half may still be oversized when one giant cell dominates, in which
/// case the caller splits it again.
fn split2(left: &mut BNode, right: &mut BNode, old: &BNode) {
    assert!(old.nkeys() >= 2, "cannot split a node with < 2 keys");

    let mut nleft = old.nkeys() / 2;

    let left_bytes = |nleft: u16| -> usize {
        crate::config::NODE_HEADER_SIZE + 10 * nleft as usize + old.offset(nleft) as usize
    };
    while left_bytes(nleft) > PAGE_SIZE {
        nleft -= 1;
    }
    assert!(nleft >= 1, "left split half vanished");

    let right_bytes =
        |nleft: u16| -> usize { old.nbytes() - left_bytes(nleft) + crate::config::NODE_HEADER_SIZE };
    while right_bytes(nleft) > PAGE_SIZE {
        nleft += 1;
    }
    assert!(nleft < old.nkeys(), "right split half vanished");
    let nright = old.nkeys() - nleft;

    left.set_header(old.node_type(), nleft);
    right.set_header(old.node_type(), nright);
    left.append_range(old, 0, 0, nleft);
    right.append_range(old, 0, nleft, nright);

    assert!(right.nbytes() <= PAGE_SIZE, "right split half oversized");
}

/// Splits a node into 1..=3 page-sized pieces. A node that already fits is
/// returned whole.
pub fn split3(old: BNode) -> SmallVec<[BNode; 3]> {
    if old.nbytes() <= PAGE_SIZE {
        let mut out = SmallVec::new();
        out.push(old.finalize());
        return out;
    }

    let mut left = BNode::new_scratch(); // may be split again below
    let mut right = BNode::new_page();
    split2(&mut left, &mut right, &old);

    if left.nbytes() <= PAGE_SIZE {
        let mut out = SmallVec::new();
        out.push(left.finalize());
        out.push(right);
        return out;
    }

    let mut leftleft = BNode::new_page();
    let mut middle = BNode::new_page();
    split2(&mut leftleft, &mut middle, &left);
    assert!(leftleft.nbytes() <= PAGE_SIZE, "three-way split failed");

    let mut out = SmallVec::new();
    out.push(leftleft);
    out.push(middle);
    out.push(right);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_KEY_SIZE;

    /// Array-of-pages store for exercising the tree without a file.
    #[derive(Default)]
    struct MemStore {
        pages: Vec<Option<BNode>>,
    }

    impl MemStore {
        fn new() -> Self {
            // Slot 0 stands in for the reserved master page.
            Self {
                pages: vec![None],
            }
        }

        fn live_pages(&self) -> usize {
            self.pages.iter().filter(|p| p.is_some()).count()
        }
    }

    impl PageStore for MemStore {
        fn page_get(&self, ptr: u64) -> BNode {
            self.pages[ptr as usize]
                .as_ref()
                .expect("dereferenced a released page")
                .clone()
        }

        fn page_new(&mut self, node: BNode) -> u64 {
            assert!(node.as_bytes().len() <= PAGE_SIZE);
            self.pages.push(Some(node));
            (self.pages.len() - 1) as u64
        }

        fn page_del(&mut self, ptr: u64) {
            self.pages[ptr as usize] = None;
        }
    }

    fn check_node(store: &MemStore, node: &BNode, is_root: bool) {
        assert!(node.nbytes() <= PAGE_SIZE);
        for i in 1..node.nkeys() {
            assert!(node.key(i - 1) < node.key(i), "keys out of order");
        }
        if is_root {
            assert_eq!(node.key(0), b"");
        }
        if node.node_type() == NodeType::Internal {
            for i in 0..node.nkeys() {
                let child = store.page_get(node.ptr(i));
                assert_eq!(child.key(0), node.key(i), "separator mismatch");
                check_node(store, &child, false);
            }
        }
    }

    fn check_tree(store: &MemStore, tree: &BTree) {
        if tree.root != 0 {
            check_node(store, &store.page_get(tree.root), true);
        }
    }

    #[test]
    fn empty_tree_finds_nothing() {
        let store = MemStore::new();
        let tree = BTree::default();
        assert_eq!(tree.get(&store, b"missing"), None);
    }

    #[test]
    fn first_insert_builds_root_leaf_with_dummy() {
        let mut store = MemStore::new();
        let mut tree = BTree::default();
        tree.insert(&mut store, b"hello", b"world");

        let root = store.page_get(tree.root);
        assert_eq!(root.node_type(), NodeType::Leaf);
        assert_eq!(root.nkeys(), 2);
        assert_eq!(root.key(0), b"");
        assert_eq!(root.key(1), b"hello");
        assert_eq!(tree.get(&store, b"hello"), Some(b"world".to_vec()));
    }

    #[test]
    fn insert_overwrites_existing_key() {
        let mut store = MemStore::new();
        let mut tree = BTree::default();
        tree.insert(&mut store, b"k", b"v1");
        tree.insert(&mut store, b"k", b"v2");
        assert_eq!(tree.get(&store, b"k"), Some(b"v2".to_vec()));
        check_tree(&store, &tree);
    }

    #[test]
    fn ascending_inserts_split_and_stay_ordered() {
        let mut store = MemStore::new();
        let mut tree = BTree::default();
        for i in 0..500u32 {
            let key = format!("key-{:05}", i);
            let val = format!("val-{}", i);
            tree.insert(&mut store, key.as_bytes(), val.as_bytes());
        }
        check_tree(&store, &tree);
        for i in 0..500u32 {
            let key = format!("key-{:05}", i);
            assert_eq!(
                tree.get(&store, key.as_bytes()),
                Some(format!("val-{}", i).into_bytes())
            );
        }
        assert_eq!(tree.get(&store, b"key-99999"), None);
    }

    #[test]
    fn interleaved_inserts_keep_separator_invariant() {
        let mut store = MemStore::new();
        let mut tree = BTree::default();
        // Descending then ascending exercises both split directions.
        for i in (0..250u32).rev() {
            let key = format!("d-{:05}", i);
            tree.insert(&mut store, key.as_bytes(), b"x");
        }
        for i in 0..250u32 {
            let key = format!("u-{:05}", i);
            tree.insert(&mut store, key.as_bytes(), b"y");
        }
        check_tree(&store, &tree);
        assert_eq!(tree.get(&store, b"d-00007"), Some(b"x".to_vec()));
        assert_eq!(tree.get(&store, b"u-00111"), Some(b"y".to_vec()));
    }

    #[test]
    fn giant_cells_force_three_way_split() {
        let mut store = MemStore::new();
        let mut tree = BTree::default();
        // Values near the maximum make single cells dominate a page.
        for i in 0..16u32 {
            let key = format!("big-{:03}", i);
            let val = vec![b'v'; MAX_VAL_SIZE];
            tree.insert(&mut store, key.as_bytes(), &val);
        }
        check_tree(&store, &tree);
        for i in 0..16u32 {
            let key = format!("big-{:03}", i);
            assert_eq!(tree.get(&store, key.as_bytes()).map(|v| v.len()), Some(MAX_VAL_SIZE));
        }
    }

    #[test]
    fn boundary_key_and_value_sizes_accepted() {
        let mut store = MemStore::new();
        let mut tree = BTree::default();

        tree.insert(&mut store, b"a", b"");
        assert_eq!(tree.get(&store, b"a"), Some(vec![]));

        let long_key = vec![b'k'; MAX_KEY_SIZE];
        let long_val = vec![b'v'; MAX_VAL_SIZE];
        tree.insert(&mut store, &long_key, &long_val);
        assert_eq!(tree.get(&store, &long_key), Some(long_val));
        check_tree(&store, &tree);
    }

    #[test]
    #[should_panic(expected = "empty keys are reserved")]
    fn zero_length_key_rejected() {
        let mut store = MemStore::new();
        let mut tree = BTree::default();
        tree.insert(&mut store, b"", b"v");
    }

    #[test]
    #[should_panic(expected = "key too long")]
    fn oversized_key_rejected() {
        let mut store = MemStore::new();
        let mut tree = BTree::default();
        let key = vec![b'k'; MAX_KEY_SIZE + 1];
        tree.insert(&mut store, &key, b"v");
    }

    #[test]
    #[should_panic(expected = "value too long")]
    fn oversized_value_rejected() {
        let mut store = MemStore::new();
        let mut tree = BTree::default();
        let val = vec![b'v'; MAX_VAL_SIZE + 1];
        tree.insert(&mut store, b"k", &val);
    }

    #[test]
    fn scan_yields_every_pair_in_key_order() {
        let mut store = MemStore::new();
        let mut tree = BTree::default();
        for i in [9u32, 3, 7, 1, 5, 0, 8, 2, 6, 4] {
            let key = format!("scan-{}", i);
            tree.insert(&mut store, key.as_bytes(), &i.to_le_bytes());
        }

        let entries = tree.scan(&store);
        assert_eq!(entries.len(), 10);
        for (i, (key, val)) in entries.iter().enumerate() {
            assert_eq!(key, format!("scan-{}", i).as_bytes());
            assert_eq!(val, &(i as u32).to_le_bytes());
        }
    }

    #[test]
    fn scan_of_empty_tree_is_empty() {
        let store = MemStore::new();
        let tree = BTree::default();
        assert!(tree.scan(&store).is_empty());
    }

    #[test]
    fn released_pages_outnumber_live_ones_after_churn() {
        let mut store = MemStore::new();
        let mut tree = BTree::default();
        for i in 0..100u32 {
            let key = format!("churn-{:04}", i);
            tree.insert(&mut store, key.as_bytes(), b"payload");
        }
        // Copy-on-write: every insert released its whole path.
        assert!(store.live_pages() < store.pages.len() / 2);
        check_tree(&store, &tree);
    }
}
