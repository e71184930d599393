//! Tests for TreeBuilder: rebuilding and flattening forests

use rstest::{fixture, rstest};

use treeview::domain::{BuildOptions, Diagnostic, Node, TreeBuilder, DEFAULT_MAX_DEPTH};
use treeview::util::testing;

fn ids(nodes: &[Node]) -> Vec<i64> {
    nodes.iter().map(|n| n.id).collect()
}

/// Linear chain 1 <- 2 <- ... <- len.
fn chain(len: i64) -> Vec<Node> {
    (1..=len)
        .map(|id| {
            let node = Node::new(id, format!("n{id}"));
            if id == 1 {
                node
            } else {
                node.with_parent(id - 1)
            }
        })
        .collect()
}

#[fixture]
fn catalogue() -> Vec<Node> {
    testing::init_test_setup();
    vec![
        Node::new(1, "Electronics").with_description("All devices"),
        Node::new(2, "Phones").with_parent(1).with_sort_order(2),
        Node::new(3, "Laptops").with_parent(1).with_selected(true),
        Node::new(4, "Garden"),
        Node::new(5, "Smartphones").with_parent(2),
        Node::new(6, "Tools").with_parent(4),
    ]
}

#[rstest]
fn given_catalogue_when_building_then_hierarchy_is_restored(catalogue: Vec<Node>) {
    // Act
    let forest = TreeBuilder::new().build(catalogue);

    // Assert
    assert!(forest.is_clean());
    assert_eq!(ids(&forest.roots), vec![1, 4]);
    assert_eq!(ids(&forest.roots[0].children), vec![2, 3]);
    assert_eq!(ids(&forest.roots[0].children[0].children), vec![5]);
    assert_eq!(ids(&forest.roots[1].children), vec![6]);
    assert_eq!(forest.node_count(), 6);
}

#[rstest]
fn given_clean_input_when_round_tripping_then_scalars_survive(catalogue: Vec<Node>) {
    // Arrange
    let mut expected = catalogue.clone();
    expected.sort_by_key(|n| n.id);

    // Act
    let forest = TreeBuilder::new().build(catalogue);
    let mut flat = TreeBuilder::flatten(&forest.roots);
    flat.sort_by_key(|n| n.id);

    // Assert
    assert_eq!(flat, expected);
}

#[rstest]
fn given_roots_only_when_building_then_no_children() {
    let forest = TreeBuilder::new().build(vec![Node::new(1, "a"), Node::new(2, "b")]);

    assert_eq!(ids(&forest.roots), vec![1, 2]);
    assert!(forest.roots.iter().all(Node::is_leaf));
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(10)]
fn given_linear_chain_when_building_then_single_nested_root(#[case] len: i64) {
    // Act
    let forest = TreeBuilder::new().build(chain(len));

    // Assert
    assert_eq!(forest.roots.len(), 1);
    assert_eq!(forest.roots[0].depth(), len as usize);
    assert_eq!(ids(&TreeBuilder::flatten(&forest.roots)), (1..=len).collect::<Vec<_>>());
}

#[rstest]
fn given_missing_parent_when_building_then_orphan_dropped_and_reported() {
    // Arrange
    let nodes = vec![Node::new(1, "root"), Node::new(2, "stray").with_parent(42)];

    // Act
    let forest = TreeBuilder::new().build(nodes);

    // Assert
    assert_eq!(ids(&forest.roots), vec![1]);
    assert_eq!(
        forest.diagnostics,
        vec![Diagnostic::Orphan {
            id: 2,
            parent_id: 42
        }]
    );
    assert!(!forest.has_cycles());
}

#[rstest]
fn given_two_node_cycle_when_building_then_terminates_and_reports_both() {
    // Arrange
    let nodes = vec![
        Node::new(1, "root"),
        Node::new(10, "a").with_parent(11),
        Node::new(11, "b").with_parent(10),
    ];

    // Act
    let forest = TreeBuilder::new().build(nodes);

    // Assert
    assert_eq!(ids(&forest.roots), vec![1]);
    let mut cycle_ids: Vec<i64> = forest
        .diagnostics
        .iter()
        .filter(|d| d.is_cycle())
        .map(Diagnostic::id)
        .collect();
    cycle_ids.sort();
    assert_eq!(cycle_ids, vec![10, 11]);
    assert!(forest.into_strict().is_err());
}

#[rstest]
fn given_chain_deeper_than_limit_when_building_then_cut_and_reported() {
    // Act
    let forest = TreeBuilder::new().build(chain(DEFAULT_MAX_DEPTH as i64 + 50));

    // Assert
    assert_eq!(forest.roots.len(), 1);
    assert_eq!(forest.roots[0].subtree_len(), DEFAULT_MAX_DEPTH);
    assert_eq!(
        forest.diagnostics,
        vec![Diagnostic::DepthLimit {
            id: DEFAULT_MAX_DEPTH as i64,
            depth: DEFAULT_MAX_DEPTH
        }]
    );
}

#[rstest]
fn given_raised_limit_when_building_long_chain_then_whole_chain_kept() {
    // Arrange
    let builder = TreeBuilder::with_options(BuildOptions { max_depth: 10_000 });

    // Act
    let forest = builder.build(chain(2_000));

    // Assert
    assert!(forest.is_clean());
    assert_eq!(TreeBuilder::flatten(&forest.roots).len(), 2_000);
}

#[rstest]
fn given_empty_input_when_building_then_empty_forest() {
    let forest = TreeBuilder::new().build(Vec::new());

    assert!(forest.is_empty());
    assert!(forest.is_clean());
}
