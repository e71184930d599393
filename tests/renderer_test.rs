//! Tests for the HTML tree renderer

use std::fs;

use rstest::{fixture, rstest};

use treeview::application::{render_forest, RenderOptions, TreeBinder, TreeView};
use treeview::domain::{Forest, Node, TreeBuilder, DEFAULT_MAX_DEPTH};
use treeview::util::testing;

#[fixture]
fn catalogue() -> Forest {
    testing::init_test_setup();
    let json = fs::read_to_string("tests/resources/categories.json").expect("read resource");
    let nodes: Vec<Node> = serde_json::from_str(&json).expect("parse resource");
    TreeBuilder::new().build(nodes)
}

/// Value of the hidden input `name`, unescaped.
fn hidden_value(html: &str, name: &str) -> String {
    let marker = format!(r#"name="{name}" type="hidden" value=""#);
    let start = html.find(&marker).expect("hidden field present") + marker.len();
    let end = start + html[start..].find('"').expect("closing quote");
    html[start..end]
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[rstest]
fn given_catalogue_when_rendering_then_items_nest_in_input_order(catalogue: Forest) {
    // Act
    let html = render_forest(&catalogue.roots, &RenderOptions::default()).unwrap();

    // Assert
    let electronics = html.find(r#"id="1""#).unwrap();
    let phones = html.find(r#"id="2""#).unwrap();
    let smartphones = html.find(r#"id="5""#).unwrap();
    let laptops = html.find(r#"id="3""#).unwrap();
    let garden = html.find(r#"id="4""#).unwrap();
    assert!(electronics < phones && phones < smartphones);
    assert!(smartphones < laptops && laptops < garden);
    assert!(!html.contains("Discontinued"));
    assert!(html.contains(r#"priority="2""#));
    assert_eq!(html.matches(r#"treeJsElement="treeJsElement""#).count(), 5);
}

#[rstest]
fn given_custom_empty_content_when_rendering_nothing_then_placeholder_only() {
    let options = RenderOptions {
        empty_content: "Nothing to show".to_string(),
        ..RenderOptions::default()
    };

    let html = render_forest(&[], &options).unwrap();

    assert!(html.contains(r#"<li id="-1">Nothing to show</li>"#));
    assert_eq!(html.matches("<ul").count(), 1);
}

#[rstest]
fn given_embedded_payload_when_posted_back_then_binder_restores_forest(catalogue: Forest) {
    // Arrange
    let options = RenderOptions {
        embed_payload: true,
        ..RenderOptions::default()
    };

    // Act
    let html = render_forest(&catalogue.roots, &options).unwrap();
    let nodes = hidden_value(&html, "treeHidden");
    let selected = hidden_value(&html, "treeHiddenSelected");
    let rebound = TreeBinder::new().bind(&nodes, &selected).unwrap();

    // Assert
    assert_eq!(selected, "[3]");
    assert_eq!(rebound.roots, catalogue.roots);
}

#[rstest]
fn given_chain_deeper_than_limit_when_rendering_then_cut_without_overflow() {
    // Arrange
    let mut node = Node::new(DEFAULT_MAX_DEPTH as i64 + 40, "leaf");
    for id in (1..DEFAULT_MAX_DEPTH as i64 + 40).rev() {
        let mut parent = Node::new(id, format!("n{id}"));
        node.parent_id = Some(id);
        parent.children.push(node);
        node = parent;
    }
    let roots = vec![node];

    // Act
    let html = TreeView::new(&roots)
        .children(|n: &Node| Some(n.children.as_slice()))
        .render()
        .unwrap();

    // Assert
    assert_eq!(
        html.matches(r#"treeJsElement="treeJsElement""#).count(),
        DEFAULT_MAX_DEPTH
    );
}
