//! Postback binder: hidden form payloads back into a forest.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::BuildHasher;

use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{Forest, Node, TreeBuilder, NODES_FIELD, SELECTED_FIELD};

/// Source of submitted form values.
pub trait FormFields {
    fn field(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> FormFields for HashMap<String, String, S> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl FormFields for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Parse the flat node payload. Anything but a JSON array of node objects fails.
pub fn parse_nodes(json: &str) -> ApplicationResult<Vec<Node>> {
    serde_json::from_str(json).map_err(|e| ApplicationError::parse(NODES_FIELD, e))
}

/// Parse the selected-id payload, a JSON array of integers.
pub fn parse_selected(json: &str) -> ApplicationResult<HashSet<i64>> {
    let ids: Vec<i64> =
        serde_json::from_str(json).map_err(|e| ApplicationError::parse(SELECTED_FIELD, e))?;
    Ok(ids.into_iter().collect())
}

/// Mark exactly the nodes whose id is in `selected`.
pub fn apply_selection(nodes: &mut [Node], selected: &HashSet<i64>) {
    for node in nodes {
        node.selected = selected.contains(&node.id);
    }
}

/// Turns the two postback payloads into a forest with selection applied.
#[derive(Debug, Clone, Default)]
pub struct TreeBinder {
    builder: TreeBuilder,
}

impl TreeBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: TreeBuilder) -> Self {
        Self { builder }
    }

    /// Bind raw payloads.
    ///
    /// An empty node list is returned as is without looking at the selection
    /// payload. A single node is returned without a rebuild pass. Both
    /// payloads are parsed before any node is touched.
    pub fn bind(&self, flat_json: &str, selected_json: &str) -> ApplicationResult<Forest> {
        self.bind_with(flat_json, || Ok(selected_json))
    }

    /// Bind from submitted form fields (`treeHidden`, `treeHiddenSelected`).
    pub fn bind_form<F: FormFields + ?Sized>(&self, form: &F) -> ApplicationResult<Forest> {
        let flat_json = required_field(form, NODES_FIELD)?;
        self.bind_with(flat_json, || required_field(form, SELECTED_FIELD))
    }

    #[instrument(level = "debug", skip_all)]
    fn bind_with<'s>(
        &self,
        flat_json: &str,
        selected_json: impl FnOnce() -> ApplicationResult<&'s str>,
    ) -> ApplicationResult<Forest> {
        let mut nodes = parse_nodes(flat_json)?;
        if nodes.is_empty() {
            debug!("bind: empty payload");
            return Ok(Forest::new(nodes));
        }

        let selected = parse_selected(selected_json()?)?;
        apply_selection(&mut nodes, &selected);
        debug!("bind: {} nodes, {} selected ids", nodes.len(), selected.len());

        if nodes.len() == 1 {
            return Ok(Forest::new(nodes));
        }
        Ok(self.builder.build(nodes))
    }
}

fn required_field<'f, F: FormFields + ?Sized>(form: &'f F, name: &str) -> ApplicationResult<&'f str> {
    form.field(name).ok_or_else(|| missing(name))
}

fn missing(name: &str) -> ApplicationError {
    ApplicationError::Parse {
        field: name.to_string(),
        reason: "field is missing".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAT: &str = r#"[
        {"id": 1, "title": "root", "description": null, "parentId": null, "selected": false},
        {"id": 2, "title": "a", "description": "first", "parentId": 1, "selected": true},
        {"id": 3, "title": "b", "description": null, "parentId": 1, "selected": false}
    ]"#;

    #[test]
    fn given_payloads_when_binding_then_rebuilds_and_selects() {
        let forest = TreeBinder::new().bind(FLAT, "[3]").unwrap();

        assert_eq!(forest.roots.len(), 1);
        let children = &forest.roots[0].children;
        assert_eq!(children.len(), 2);
        assert!(!children[0].selected, "selection is reset for ids not listed");
        assert!(children[1].selected);
    }

    #[test]
    fn given_empty_node_list_when_binding_then_selection_is_not_parsed() {
        let forest = TreeBinder::new().bind("[]", "not json").unwrap();

        assert!(forest.is_empty());
    }

    #[test]
    fn given_singleton_with_parent_when_binding_then_returned_without_rebuild() {
        let forest = TreeBinder::new()
            .bind(r#"[{"id": 5, "title": "lone", "parentId": 9}]"#, "[5]")
            .unwrap();

        assert_eq!(forest.roots.len(), 1);
        assert!(forest.roots[0].selected);
        assert!(forest.is_clean());
    }

    #[test]
    fn given_object_instead_of_array_when_binding_then_parse_error() {
        let err = TreeBinder::new().bind(r#"{"id": 1}"#, "[]").unwrap_err();

        assert!(err.is_parse());
        assert!(err.to_string().contains(NODES_FIELD));
    }

    #[test]
    fn given_form_without_selection_field_when_binding_then_names_missing_field() {
        let form = HashMap::from([(NODES_FIELD.to_string(), FLAT.to_string())]);

        let err = TreeBinder::new().bind_form(&form).unwrap_err();

        assert_eq!(
            err.to_string(),
            format!("cannot parse {}: field is missing", SELECTED_FIELD)
        );
    }

    #[test]
    fn given_complete_form_when_binding_then_matches_raw_bind() {
        let form = BTreeMap::from([
            (NODES_FIELD.to_string(), FLAT.to_string()),
            (SELECTED_FIELD.to_string(), "[1, 2]".to_string()),
        ]);

        let from_form = TreeBinder::new().bind_form(&form).unwrap();
        let raw = TreeBinder::new().bind(FLAT, "[2, 1]").unwrap();

        assert_eq!(from_form, raw);
    }
}
