//! Search tree and transposition tables (§4.10, C10): an arena of
//! [`TreeNode`]s addressed by integer id rather than pointers (per §9's
//! design guidance), with two content-addressed tables over the same
//! arena — `close`, the frontier of nodes waiting to be expanded, ordered
//! by a decrease-key-capable min-heap keyed on `(f, h)` lexicographically;
//! and `open`, the set of nodes already expanded. Generalizes the teacher
//! repo's fixed-bucket `PriorityQueue` (`pqueue.rs`) into a heap that
//! supports reducing a node's priority in place, using lazy invalidation
//! (a stale generation number) rather than true heap-position bookkeeping,
//! since the search only ever lowers an entry's key, never needs to find
//! an arbitrary entry by identity once it's queued.

use crate::deadlock::PushCandidate;
use crate::node::Node;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeNodeId(usize);

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub node: Node,
    pub parent: Option<TreeNodeId>,
    pub children: Vec<TreeNodeId>,
    pub g: u64,
    pub h: u64,
    /// The push that produced this node from its parent; `None` for the
    /// root.
    pub push: Option<PushCandidate>,
    pub push_count: u32,
    generation: u32,
}

impl TreeNode {
    pub fn f(&self) -> u64 {
        self.g.saturating_add(self.h)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct HeapKey {
    f: u64,
    h: u64,
    generation: u32,
    id: TreeNodeId,
}

/// The arena plus the two transposition tables. Both `open` and `close`
/// map a node's [`Node::hash_key`] to the (usually singleton) list of
/// arena ids that hash to it, since the hash is not collision-free.
pub struct Tree {
    arena: Vec<Option<TreeNode>>,
    close_heap: BinaryHeap<Reverse<HeapKey>>,
    close_index: HashMap<u64, Vec<TreeNodeId>>,
    open_index: HashMap<u64, Vec<TreeNodeId>>,
    close_len: usize,
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            arena: Vec::new(),
            close_heap: BinaryHeap::new(),
            close_index: HashMap::new(),
            open_index: HashMap::new(),
            close_len: 0,
        }
    }

    pub fn get(&self, id: TreeNodeId) -> &TreeNode {
        self.arena[id.0].as_ref().expect("dangling tree node id")
    }

    pub fn close_len(&self) -> usize {
        self.close_len
    }

    /// Total entries across every bucket of the `open` transposition table
    /// (§6's `open_table_cap`) — distinct from the close heap's length,
    /// since a single expansion can fan many successors into `open` at
    /// once without ever touching the close frontier's size.
    pub fn open_table_len(&self) -> usize {
        self.open_index.values().map(|v| v.len()).sum()
    }

    /// Rough resident-memory estimate for the arena (§6's `max_ram_mib`):
    /// every occupied-or-freed slot still counts, since `prune_dead_branch`
    /// nulls a slot in place rather than shrinking the backing `Vec`. The
    /// per-node byte cost is supplied by the caller, since it depends on a
    /// level's reachable-cell count, which `Tree` has no visibility into.
    pub fn estimated_bytes(&self, bytes_per_node: usize) -> u64 {
        (self.arena.len() as u64).saturating_mul(bytes_per_node as u64)
    }

    pub fn insert_root(&mut self, node: Node, h: u64) -> TreeNodeId {
        let id = self.alloc(TreeNode {
            node,
            parent: None,
            children: Vec::new(),
            g: 0,
            h,
            push: None,
            push_count: 0,
            generation: 0,
        });
        self.push_close(id);
        id
    }

    fn alloc(&mut self, node: TreeNode) -> TreeNodeId {
        let id = TreeNodeId(self.arena.len());
        let key = node.node.hash_key();
        self.arena.push(Some(node));
        self.index_insert(key, id, false);
        id
    }

    fn index_insert(&mut self, key: u64, id: TreeNodeId, open: bool) {
        let table = if open { &mut self.open_index } else { &mut self.close_index };
        table.entry(key).or_default().push(id);
    }

    fn push_close(&mut self, id: TreeNodeId) {
        let n = self.get(id);
        self.close_heap.push(Reverse(HeapKey {
            f: n.f(),
            h: n.h,
            generation: n.generation,
            id,
        }));
        self.close_len += 1;
    }

    /// Finds an existing arena entry (in either table) whose `Node`
    /// equals `node`, for duplicate handling.
    fn find(&self, node: &Node, open: bool) -> Option<TreeNodeId> {
        let table = if open { &self.open_index } else { &self.close_index };
        table.get(&node.hash_key())?.iter().copied().find(|&id| &self.get(id).node == node)
    }

    /// Pops the lowest-`(f, h)` node off the close frontier, skipping
    /// stale entries left behind by `offer`'s decrease-key path. Returns
    /// `None` once the frontier is empty.
    pub fn pop_close(&mut self) -> Option<TreeNodeId> {
        while let Some(Reverse(key)) = self.close_heap.pop() {
            self.close_len -= 1;
            let current_generation = self.arena[key.id.0].as_ref().map(|n| n.generation);
            if current_generation != Some(key.generation) {
                continue; // stale: this id was reparented or removed since
            }
            let node_key = self.get(key.id).node.hash_key();
            if let Some(ids) = self.close_index.get_mut(&node_key) {
                ids.retain(|&x| x != key.id);
            }
            return Some(key.id);
        }
        None
    }

    /// Marks a close-frontier node as expanded: moves it from `close`'s
    /// index into `open`'s.
    pub fn mark_expanded(&mut self, id: TreeNodeId) {
        let key = self.get(id).node.hash_key();
        self.index_insert(key, id, true);
    }

    /// Offers a freshly generated successor into the tree, applying the
    /// duplicate-handling rules from §4.10: if a cheaper path to the same
    /// state already exists (in either table), drop this one; if this
    /// path is strictly cheaper, reparent in place (and reopen it if it
    /// had already been expanded); otherwise insert fresh.
    pub fn offer(&mut self, parent: TreeNodeId, node: Node, g: u64, h: u64, push: PushCandidate, push_count: u32) {
        if let Some(existing) = self.find(&node, false) {
            if g < self.get(existing).g {
                self.reparent(existing, parent, g, push, push_count);
                self.requeue_close(existing);
            }
            return;
        }
        if let Some(existing) = self.find(&node, true) {
            if g < self.get(existing).g {
                self.reparent(existing, parent, g, push, push_count);
                self.reopen(existing);
            }
            return;
        }

        let id = self.alloc(TreeNode {
            node,
            parent: Some(parent),
            children: Vec::new(),
            g,
            h,
            push: Some(push),
            push_count,
            generation: 0,
        });
        self.arena[parent.0].as_mut().unwrap().children.push(id);
        self.push_close(id);
    }

    fn reparent(&mut self, id: TreeNodeId, new_parent: TreeNodeId, g: u64, push: PushCandidate, push_count: u32) {
        if let Some(old_parent) = self.get(id).parent {
            self.arena[old_parent.0].as_mut().unwrap().children.retain(|&c| c != id);
        }
        let n = self.arena[id.0].as_mut().unwrap();
        n.parent = Some(new_parent);
        n.g = g;
        n.push = Some(push);
        n.push_count = push_count;
        n.generation += 1;
        self.arena[new_parent.0].as_mut().unwrap().children.push(id);
    }

    fn requeue_close(&mut self, id: TreeNodeId) {
        self.push_close(id);
        let key = self.get(id).node.hash_key();
        self.close_index.entry(key).or_default().push(id);
    }

    fn reopen(&mut self, id: TreeNodeId) {
        let key = self.get(id).node.hash_key();
        if let Some(ids) = self.open_index.get_mut(&key) {
            ids.retain(|&x| x != id);
        }
        self.close_index.entry(key).or_default().push(id);
        self.requeue_close(id);
    }

    /// Walks parent links from `id`, collecting the push sequence in
    /// root-to-`id` order.
    pub fn path_to_root(&self, mut id: TreeNodeId) -> Vec<(PushCandidate, u32)> {
        let mut out = Vec::new();
        loop {
            let n = self.get(id);
            match (n.push, n.parent) {
                (Some(p), Some(parent)) => {
                    out.push((p, n.push_count));
                    id = parent;
                }
                _ => break,
            }
        }
        out.reverse();
        out
    }

    /// Bottom-up dead-branch garbage collection (§4.10, §9 Open Question
    /// 2): removes `id` and walks up through ancestors, removing any that
    /// are left with no children and are not themselves queued in
    /// `close`, since such a node can no longer contribute to any future
    /// expansion.
    pub fn prune_dead_branch(&mut self, mut id: TreeNodeId) {
        loop {
            let node_key = self.get(id).node.hash_key();
            let in_close = self
                .close_index
                .get(&node_key)
                .is_some_and(|ids| ids.contains(&id));
            if in_close || !self.get(id).children.is_empty() {
                break;
            }

            let parent = self.get(id).parent;
            if let Some(ids) = self.open_index.get_mut(&node_key) {
                ids.retain(|&x| x != id);
            }
            self.arena[id.0] = None;

            match parent {
                Some(p) => {
                    self.arena[p.0].as_mut().unwrap().children.retain(|&c| c != id);
                    id = p;
                }
                None => break,
            }
        }
    }

    /// Debug-only invariant check: every arena slot still occupied must
    /// either be in `close`, or have at least one live descendant (i.e.
    /// it's an ancestor of something reachable, not a dead branch GC
    /// missed).
    #[cfg(debug_assertions)]
    pub fn assert_invariants(&self) {
        for (i, slot) in self.arena.iter().enumerate() {
            let Some(n) = slot else { continue };
            let id = TreeNodeId(i);
            let node_key = n.node.hash_key();
            let in_close = self.close_index.get(&node_key).is_some_and(|ids| ids.contains(&id));
            if !in_close {
                assert!(
                    !n.children.is_empty() || n.parent.is_none(),
                    "dead branch left un-pruned at arena slot {i}"
                );
            }
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
