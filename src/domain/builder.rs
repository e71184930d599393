//! Tree builder: flat parent-referenced nodes to forest and back.

use std::collections::HashSet;

use generational_arena::Index;
use tracing::{debug, instrument, warn};

use crate::domain::arena::NodeArena;
use crate::domain::entities::{Diagnostic, Forest, Node};

/// Default cap on forest depth, roots counting as depth 1.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Knobs for [`TreeBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Nodes at this depth keep no children
    pub max_depth: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Constructs forests from flat node collections.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    options: BuildOptions,
}

enum Step {
    Enter(Index, usize),
    Exit(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chain {
    Unvisited,
    Open,
    Settled,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BuildOptions) -> Self {
        Self {
            options: BuildOptions {
                max_depth: options.max_depth.max(1),
            },
        }
    }

    pub fn options(&self) -> BuildOptions {
        self.options
    }

    /// Rebuild the hierarchy expressed by `parent_id` references.
    ///
    /// Roots come out in input order and so do each node's children. Orphans
    /// are left out of the forest and reported as [`Diagnostic::Orphan`];
    /// cycles and depth cuts never abort the build.
    #[instrument(level = "debug", skip(self, nodes), fields(len = nodes.len()))]
    pub fn build(&self, nodes: Vec<Node>) -> Forest {
        let mut arena = NodeArena::from_flat(nodes);
        let mut diagnostics = Vec::new();
        let mut depth_cut = HashSet::new();

        let order = arena.order().to_vec();
        for idx in order {
            let is_root = arena.get(idx).is_some_and(|n| n.data.is_root());
            if is_root && arena.attach_root(idx) {
                self.grow(&mut arena, idx, &mut depth_cut, &mut diagnostics);
            }
        }

        classify_unattached(&arena, &mut diagnostics);

        debug!(
            "build: {} roots, {} diagnostics",
            arena.roots().len(),
            diagnostics.len()
        );
        Forest {
            roots: arena.into_forest(),
            diagnostics,
        }
    }

    /// Attach everything reachable from `root`, depth first with an explicit stack.
    ///
    /// `depth_cut` holds ids already reported as cut, so duplicate id slots at
    /// the cap yield one diagnostic.
    fn grow(
        &self,
        arena: &mut NodeArena,
        root: Index,
        depth_cut: &mut HashSet<i64>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let mut ancestors: HashSet<i64> = HashSet::new();
        let mut stack = vec![Step::Enter(root, 1)];

        while let Some(step) = stack.pop() {
            let (idx, depth) = match step {
                Step::Exit(id) => {
                    ancestors.remove(&id);
                    continue;
                }
                Step::Enter(idx, depth) => (idx, depth),
            };
            let Some(id) = arena.get(idx).map(|n| n.data.id) else {
                continue;
            };
            let candidates = arena.candidates(id).to_vec();
            if candidates.is_empty() {
                continue;
            }
            if depth >= self.options.max_depth {
                let drops_children = candidates.iter().any(|&c| !arena.is_attached(c));
                if drops_children && depth_cut.insert(id) {
                    warn!("depth limit {} reached at node {}", depth, id);
                    diagnostics.push(Diagnostic::DepthLimit { id, depth });
                }
                continue;
            }

            ancestors.insert(id);
            stack.push(Step::Exit(id));

            let mut next = Vec::with_capacity(candidates.len());
            for child in candidates {
                let Some(child_id) = arena.get(child).map(|n| n.data.id) else {
                    continue;
                };
                if ancestors.contains(&child_id) {
                    // cut as a leaf; an already placed slot was reported where it was placed
                    if arena.attach(idx, child) {
                        warn!("cycle detected: node {} is its own ancestor", child_id);
                        diagnostics.push(Diagnostic::CycleDetected {
                            id: child_id,
                            parent_id: Some(id),
                        });
                    }
                    continue;
                }
                if arena.attach(idx, child) {
                    next.push(Step::Enter(child, depth + 1));
                } else {
                    debug!("node {} already placed, skipping duplicate link", child_id);
                }
            }
            stack.extend(next.into_iter().rev());
        }
    }

    /// Pre-order flat copy of `forest`, children cleared.
    pub fn flatten(forest: &[Node]) -> Vec<Node> {
        let mut flat = Vec::new();
        let mut stack: Vec<&Node> = forest.iter().rev().collect();
        while let Some(node) = stack.pop() {
            flat.push(node.detached());
            stack.extend(node.children.iter().rev());
        }
        flat
    }
}

/// Build with default options.
pub fn build(nodes: Vec<Node>) -> Forest {
    TreeBuilder::new().build(nodes)
}

/// See [`TreeBuilder::flatten`].
pub fn flatten(forest: &[Node]) -> Vec<Node> {
    TreeBuilder::flatten(forest)
}

/// Explain every node the walk from the roots never reached.
///
/// Each unattached node's parent chain is followed until it hits the forest,
/// a missing parent (the chain's head is an orphan) or itself (every node on
/// the loop is part of a detached cycle). Descendants of orphans and of
/// detached cycles are dropped without a diagnostic of their own.
fn classify_unattached(arena: &NodeArena, diagnostics: &mut Vec<Diagnostic>) {
    let order = arena.order();
    let mut state = vec![Chain::Unvisited; order.len()];
    let mut verdicts: Vec<Option<Diagnostic>> = vec![None; order.len()];

    for start in 0..order.len() {
        if state[start] != Chain::Unvisited {
            continue;
        }

        let mut path = Vec::new();
        let mut cur = start;
        loop {
            let idx = order[cur];
            let Some(slot) = arena.get(idx) else { break };
            if arena.is_attached(idx) || state[cur] == Chain::Settled {
                break;
            }
            if state[cur] == Chain::Open {
                if let Some(from) = path.iter().position(|&p| p == cur) {
                    for &member in &path[from..] {
                        if let Some(node) = arena.get(order[member]) {
                            warn!("cycle detected: node {} never reaches a root", node.data.id);
                            verdicts[member] = Some(Diagnostic::CycleDetected {
                                id: node.data.id,
                                parent_id: node.data.parent_id,
                            });
                        }
                    }
                }
                break;
            }

            state[cur] = Chain::Open;
            path.push(cur);

            let Some(parent_id) = slot.data.parent_id else { break };
            match arena.lookup(parent_id).and_then(|p| arena.get(p)) {
                Some(parent) => cur = parent.position,
                None => {
                    debug!(
                        "orphan dropped: node {} references missing parent {}",
                        slot.data.id, parent_id
                    );
                    verdicts[cur] = Some(Diagnostic::Orphan {
                        id: slot.data.id,
                        parent_id,
                    });
                    break;
                }
            }
        }

        for p in path {
            state[p] = Chain::Settled;
        }
    }

    diagnostics.extend(verdicts.into_iter().flatten());
}
