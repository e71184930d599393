//! Arena-backed adjacency for flat node collections.
//!
//! Nodes are stored once in a generational arena and linked by index, so the
//! builder never holds aliased references into a live tree. Owned `Node`
//! trees are produced at the very end by [`NodeArena::into_forest`].

use std::collections::HashMap;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::Node;

/// Arena slot: one flat node plus its resolved links.
#[derive(Debug)]
pub struct ArenaNode {
    /// Flat node data; `children` is always empty here
    pub data: Node,
    /// Position in the input collection
    pub position: usize,
    /// Indices of attached children, in input order
    pub children: Vec<Index>,
    attached: bool,
}

/// Flat node collection indexed for O(1) parent/child lookups.
///
/// The id→children index is built in one pass over the input; attaching
/// nodes into trees is left to the builder.
#[derive(Debug, Default)]
pub struct NodeArena {
    arena: Arena<ArenaNode>,
    /// Every slot in input order
    order: Vec<Index>,
    /// Attached roots in input order
    roots: Vec<Index>,
    /// First slot carrying each id
    by_id: HashMap<i64, Index>,
    /// Candidate children per parent id, in input order
    children_by_parent: HashMap<i64, Vec<Index>>,
}

impl NodeArena {
    /// Index a flat collection. Any `children` carried by the input are discarded.
    #[instrument(level = "trace", skip(nodes), fields(len = nodes.len()))]
    pub fn from_flat(nodes: Vec<Node>) -> Self {
        let mut index = Self {
            arena: Arena::with_capacity(nodes.len()),
            order: Vec::with_capacity(nodes.len()),
            ..Self::default()
        };

        for (position, mut data) in nodes.into_iter().enumerate() {
            data.children = Vec::new();
            let id = data.id;
            let parent_id = data.parent_id;
            let idx = index.arena.insert(ArenaNode {
                data,
                position,
                children: Vec::new(),
                attached: false,
            });

            index.order.push(idx);
            index.by_id.entry(id).or_insert(idx);
            if let Some(parent_id) = parent_id {
                index
                    .children_by_parent
                    .entry(parent_id)
                    .or_default()
                    .push(idx);
            }
        }

        index
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, idx: Index) -> Option<&ArenaNode> {
        self.arena.get(idx)
    }

    /// Slots in input order.
    pub fn order(&self) -> &[Index] {
        &self.order
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    /// First slot carrying `id`.
    pub fn lookup(&self, id: i64) -> Option<Index> {
        self.by_id.get(&id).copied()
    }

    /// Slots whose `parent_id` equals `parent_id`, attached or not.
    pub fn candidates(&self, parent_id: i64) -> &[Index] {
        self.children_by_parent
            .get(&parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_attached(&self, idx: Index) -> bool {
        self.arena.get(idx).is_some_and(|n| n.attached)
    }

    pub fn attach_root(&mut self, idx: Index) -> bool {
        match self.arena.get_mut(idx) {
            Some(node) if !node.attached => {
                node.attached = true;
                self.roots.push(idx);
                true
            }
            _ => false,
        }
    }

    /// Link `child` under `parent`. Returns false if the child is already
    /// placed somewhere in the forest.
    pub fn attach(&mut self, parent: Index, child: Index) -> bool {
        if self.is_attached(child) || self.arena.get(parent).is_none() {
            return false;
        }
        if let Some(node) = self.arena.get_mut(child) {
            node.attached = true;
        }
        if let Some(node) = self.arena.get_mut(parent) {
            node.children.push(child);
        }
        true
    }

    /// Post-order over all attached trees, roots in order.
    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    /// Consume the arena into owned trees. Unattached slots are dropped.
    ///
    /// Runs post-order with an explicit output stack: when a node is
    /// reached, its finished children are the last `children.len()` entries.
    #[instrument(level = "trace", skip(self))]
    pub fn into_forest(mut self) -> Vec<Node> {
        let postorder: Vec<Index> = self.iter_postorder().map(|(idx, _)| idx).collect();
        let mut built: Vec<Node> = Vec::with_capacity(postorder.len());

        for idx in postorder {
            if let Some(slot) = self.arena.remove(idx) {
                let mut node = slot.data;
                let split = built.len() - slot.children.len();
                node.children = built.split_off(split);
                built.push(node);
            }
        }

        built
    }
}

pub struct PostOrderIterator<'a> {
    arena: &'a NodeArena,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(arena: &'a NodeArena) -> Self {
        let stack = arena.roots.iter().rev().map(|&idx| (idx, false)).collect();
        Self { arena, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a ArenaNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}
