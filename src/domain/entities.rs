//! Domain entities: core data structures

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Form field carrying the flat node array on postback.
pub const NODES_FIELD: &str = "treeHidden";

/// Form field carrying the selected-id array on postback.
pub const SELECTED_FIELD: &str = "treeHiddenSelected";

/// A single tree record.
///
/// In the flat (wire/storage) form `children` is empty and hierarchy is
/// expressed only through `parent_id`. After [`TreeBuilder::build`] the
/// children are populated and owned by their parent.
///
/// [`TreeBuilder::build`]: crate::domain::TreeBuilder::build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `None` marks a root
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            parent_id: None,
            selected: false,
            sort_order: None,
            children: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Copy of this node without its children (the flat form).
    /// Does not clone the subtree.
    pub fn detached(&self) -> Self {
        Self {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            parent_id: self.parent_id,
            selected: self.selected,
            sort_order: self.sort_order,
            children: Vec::new(),
        }
    }

    /// Number of levels in this subtree, counting the node itself.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, level)) = stack.pop() {
            max = max.max(level);
            stack.extend(node.children.iter().map(|c| (c, level + 1)));
        }
        max
    }

    /// Number of nodes in this subtree, counting the node itself.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// Natural string form of a node: its title.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Something the builder had to tolerate while reconstructing a forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The node's subtree was cut (or the node never reached a root) because
    /// its id repeats on its own ancestor chain.
    CycleDetected { id: i64, parent_id: Option<i64> },
    /// The node's parent id matches no node in the collection; dropped.
    Orphan { id: i64, parent_id: i64 },
    /// The node sits at the depth cap; its children were cut.
    DepthLimit { id: i64, depth: usize },
}

impl Diagnostic {
    pub fn id(&self) -> i64 {
        match self {
            Diagnostic::CycleDetected { id, .. }
            | Diagnostic::Orphan { id, .. }
            | Diagnostic::DepthLimit { id, .. } => *id,
        }
    }

    pub fn is_cycle(&self) -> bool {
        matches!(self, Diagnostic::CycleDetected { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::CycleDetected {
                id,
                parent_id: Some(parent),
            } => write!(f, "cycle detected: node {} (parent {})", id, parent),
            Diagnostic::CycleDetected { id, parent_id: None } => {
                write!(f, "cycle detected: node {}", id)
            }
            Diagnostic::Orphan { id, parent_id } => {
                write!(f, "orphan dropped: node {} references missing parent {}", id, parent_id)
            }
            Diagnostic::DepthLimit { id, depth } => {
                write!(f, "depth limit reached at node {} (depth {})", id, depth)
            }
        }
    }
}

/// Ordered root nodes plus the diagnostics produced while building them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    pub roots: Vec<Node>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Forest {
    pub fn new(roots: Vec<Node>) -> Self {
        Self {
            roots,
            diagnostics: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// True when nothing was dropped or cut.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn has_cycles(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_cycle)
    }

    pub fn orphans(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::Orphan { .. }))
    }

    /// Total number of nodes across all roots.
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(Node::subtree_len).sum()
    }

    /// Fail on the first cycle diagnostic, otherwise hand out the roots.
    pub fn into_strict(self) -> Result<Vec<Node>, DomainError> {
        match self.diagnostics.iter().find(|d| d.is_cycle()) {
            Some(cycle) => Err(DomainError::CycleDetected(cycle.id())),
            None => Ok(self.roots),
        }
    }
}
