//! Text rendering of forests via `termtree`.

use termtree::Tree;
use tracing::instrument;

use crate::domain::{Forest, Node};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeNodeConvert for Node {
    fn to_tree_string(&self) -> Tree<String> {
        let leaves: Vec<_> = self.children.iter().map(|c| c.to_tree_string()).collect();
        Tree::new(label(self)).with_leaves(leaves)
    }
}

impl TreeNodeConvert for Forest {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        if self.is_empty() {
            return Tree::new("Empty tree".to_string());
        }
        let leaves: Vec<_> = self.roots.iter().map(|r| r.to_tree_string()).collect();
        Tree::new(".".to_string()).with_leaves(leaves)
    }
}

fn label(node: &Node) -> String {
    let marker = if node.selected { " *" } else { "" };
    format!("{} [{}]{}", node.title, node.id, marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_forest_when_converting_then_children_are_indented() {
        let forest = Forest::new(vec![Node {
            children: vec![Node::new(2, "leaf").with_parent(1).with_selected(true)],
            ..Node::new(1, "top")
        }]);

        let text = forest.to_tree_string().to_string();

        assert_eq!(text, ".\n└── top [1]\n    └── leaf [2] *\n");
    }

    #[test]
    fn given_empty_forest_when_converting_then_placeholder() {
        let text = Forest::new(vec![]).to_tree_string().to_string();

        assert_eq!(text, "Empty tree\n");
    }
}
