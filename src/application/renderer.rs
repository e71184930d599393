//! HTML tree renderer
//!
//! Walks a forest through a caller-supplied children accessor and emits the
//! nested list markup the client-side tree script expects, followed by the two
//! hidden postback fields.
//!
//! Node attributes come from a name-driven projection: each item reports its
//! fields by name through [`TreeItem`], names are normalized (lower case, no
//! `_` or `-`) and looked up in a fixed table. Typed [`Node`]s and untyped
//! [`serde_json::Value`] objects therefore render identically.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{instrument, warn};

use crate::application::markup::{escape_html, Tag};
use crate::domain::{DomainError, Node, DEFAULT_MAX_DEPTH, NODES_FIELD, SELECTED_FIELD};

pub const DEFAULT_EMPTY_CONTENT: &str = "No children";

/// `id` of the placeholder item wrapping the whole tree.
pub const ROOT_PLACEHOLDER_ID: &str = "-1";

/// `id` of the element the client script mounts on.
pub const CONTAINER_ID: &str = "jstree";

/// Marks an element as a tree node for the client script.
pub const MARKER_ATTRIBUTE: &str = "treeJsElement";

/// A field value as reported by a [`TreeItem`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Text(Cow<'a, str>),
}

impl FieldValue<'_> {
    fn to_attribute(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Text(s) => Some(s.to_string()),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Text(s) => Value::String(s.to_string()),
        }
    }
}

impl<'a, T: Into<FieldValue<'a>>> From<Option<T>> for FieldValue<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

impl From<i64> for FieldValue<'_> {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(value: &'a str) -> Self {
        FieldValue::Text(Cow::Borrowed(value))
    }
}

/// Anything the renderer can draw as a tree node.
pub trait TreeItem {
    /// Natural string form, used when no display text selector is set.
    fn text(&self) -> String;

    /// Report every scalar field by name. Nested values are not reported.
    fn visit_fields(&self, visit: &mut dyn FnMut(&str, FieldValue<'_>));
}

impl TreeItem for Node {
    fn text(&self) -> String {
        self.to_string()
    }

    fn visit_fields(&self, visit: &mut dyn FnMut(&str, FieldValue<'_>)) {
        visit("id", self.id.into());
        visit("title", self.title.as_str().into());
        visit("description", self.description.as_deref().into());
        visit("parent_id", self.parent_id.into());
        visit("selected", FieldValue::Bool(self.selected));
        visit("sort_order", self.sort_order.into());
    }
}

impl TreeItem for Value {
    fn text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn visit_fields(&self, visit: &mut dyn FnMut(&str, FieldValue<'_>)) {
        let Value::Object(map) = self else { return };
        for (key, value) in map {
            let field = match value {
                Value::Null => FieldValue::Null,
                Value::Bool(b) => FieldValue::Bool(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => FieldValue::Int(i),
                    None => FieldValue::Text(Cow::Owned(n.to_string())),
                },
                Value::String(s) => FieldValue::Text(Cow::Borrowed(s.as_str())),
                Value::Array(_) | Value::Object(_) => continue,
            };
            visit(key.as_str(), field);
        }
    }
}

struct FieldRule {
    field: &'static str,
    attribute: Option<&'static str>,
    wire: &'static str,
    nullable: bool,
}

/// Normalized field name → markup attribute and wire key. Nullable fields
/// render a null as an empty attribute; others drop it.
const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: "id",
        attribute: Some("id"),
        wire: "id",
        nullable: false,
    },
    FieldRule {
        field: "title",
        attribute: Some("data-title"),
        wire: "title",
        nullable: false,
    },
    FieldRule {
        field: "description",
        attribute: Some("data-description"),
        wire: "description",
        nullable: true,
    },
    FieldRule {
        field: "parentid",
        attribute: Some("data-parentId"),
        wire: "parentId",
        nullable: true,
    },
    FieldRule {
        field: "sortorder",
        attribute: Some("priority"),
        wire: "sortOrder",
        nullable: false,
    },
    FieldRule {
        field: "selected",
        attribute: None,
        wire: "selected",
        nullable: false,
    },
];

/// `ParentId`, `parent_id` and `parent-id` all normalize to `parentid`.
pub fn normalize_field_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn rule_for(name: &str) -> Option<&'static FieldRule> {
    let normalized = normalize_field_name(name);
    FIELD_RULES.iter().find(|rule| rule.field == normalized)
}

/// Markup attributes for one item. The first field mapping to an attribute wins.
pub fn project_attributes<T: TreeItem + ?Sized>(item: &T) -> BTreeMap<&'static str, String> {
    let mut attributes = BTreeMap::new();
    item.visit_fields(&mut |name, value| {
        let Some(rule) = rule_for(name) else { return };
        let Some(attribute) = rule.attribute else { return };
        let rendered = match value.to_attribute() {
            Some(v) => v,
            None if rule.nullable => String::new(),
            None => return,
        };
        attributes.entry(attribute).or_insert(rendered);
    });
    attributes
}

/// Flat wire record for one item: known fields only, children omitted.
/// Nulls are kept only for nullable fields.
pub fn flat_record<T: TreeItem + ?Sized>(item: &T) -> Map<String, Value> {
    let mut record = Map::new();
    item.visit_fields(&mut |name, value| {
        let Some(rule) = rule_for(name) else { return };
        if matches!(value, FieldValue::Null) && !rule.nullable {
            return;
        }
        record.entry(rule.wire).or_insert_with(|| value.to_json());
    });
    record
}

/// Renderer settings that are plain data (the `render` config section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Markup shown in the root placeholder item
    pub empty_content: String,
    /// Items at this depth render without their children
    pub max_depth: usize,
    /// Pre-fill the hidden postback fields instead of leaving them empty
    pub embed_payload: bool,
    /// Attributes merged onto the outer list element
    pub root_attributes: BTreeMap<String, String>,
    /// Attributes merged onto every nested list element
    pub child_attributes: BTreeMap<String, String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            empty_content: DEFAULT_EMPTY_CONTENT.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            embed_payload: false,
            root_attributes: BTreeMap::new(),
            child_attributes: BTreeMap::new(),
        }
    }
}

type TextFn<'a, T> = Box<dyn Fn(&T) -> String + 'a>;
type ChildrenFn<'a, T> = Box<dyn Fn(&T) -> Option<&[T]> + 'a>;

/// HTML tree for a collection of items.
///
/// ```ignore
/// let html = TreeView::new(&forest.roots)
///     .children(|n: &Node| Some(n.children.as_slice()))
///     .empty_content("Categories")
///     .render()?;
/// ```
pub struct TreeView<'a, T> {
    items: &'a [T],
    display_text: Option<TextFn<'a, T>>,
    item_template: Option<TextFn<'a, T>>,
    children: Option<ChildrenFn<'a, T>>,
    options: RenderOptions,
}

impl<T> fmt::Debug for TreeView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeView")
            .field("items", &self.items.len())
            .field("has_children", &self.children.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

enum Emit<'t, T> {
    List(&'t [T], usize),
    Item(&'t T, usize),
    CloseItem,
    CloseList,
}

impl<'a, T: TreeItem> TreeView<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self {
            items,
            display_text: None,
            item_template: None,
            children: None,
            options: RenderOptions::default(),
        }
    }

    /// Text rendered for each item by the default template.
    pub fn item_text(mut self, selector: impl Fn(&T) -> String + 'a) -> Self {
        self.display_text = Some(Box::new(selector));
        self
    }

    /// Markup rendered for each item; inserted without escaping.
    pub fn item_template(mut self, template: impl Fn(&T) -> String + 'a) -> Self {
        self.item_template = Some(Box::new(template));
        self
    }

    /// How to find an item's children. Required.
    pub fn children(mut self, selector: impl Fn(&T) -> Option<&[T]> + 'a) -> Self {
        self.children = Some(Box::new(selector));
        self
    }

    pub fn empty_content(mut self, content: impl Into<String>) -> Self {
        self.options.empty_content = content.into();
        self
    }

    pub fn html_attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.options.root_attributes = attributes;
        self
    }

    pub fn children_html_attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.options.child_attributes = attributes;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    pub fn embed_payload(mut self, embed: bool) -> Self {
        self.options.embed_payload = embed;
        self
    }

    /// Replace all plain-data settings at once.
    pub fn options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Produce the widget markup.
    ///
    /// # Errors
    /// [`DomainError::Configuration`] when no children accessor was set.
    #[instrument(level = "debug", skip(self), fields(items = self.items.len()))]
    pub fn render(&self) -> Result<String, DomainError> {
        let children = self
            .children
            .as_deref()
            .ok_or(DomainError::Configuration { option: "children" })?;

        let mut out = String::new();
        let outer = Tag::new("div");
        outer.write_start(&mut out);

        let container = Tag::new("div").with_attribute("id", CONTAINER_ID);
        container.write_start(&mut out);

        let mut root_list = Tag::new("ul");
        root_list.merge_attributes(&self.options.root_attributes);
        root_list.write_start(&mut out);

        let placeholder = Tag::new("li").with_attribute("id", ROOT_PLACEHOLDER_ID);
        placeholder.write_start(&mut out);
        out.push_str(&self.options.empty_content);
        if !self.items.is_empty() {
            self.write_items(&mut out, children);
        }
        placeholder.write_end(&mut out);
        root_list.write_end(&mut out);
        container.write_end(&mut out);

        let (nodes_payload, selected_payload) = if self.options.embed_payload {
            self.payloads(children)
        } else {
            (String::new(), String::new())
        };
        hidden_input(NODES_FIELD, nodes_payload).write_self_closing(&mut out);
        hidden_input(SELECTED_FIELD, selected_payload).write_self_closing(&mut out);

        outer.write_end(&mut out);
        Ok(out)
    }

    fn max_depth_limit(&self) -> usize {
        self.options.max_depth.max(1)
    }

    fn write_items(&self, out: &mut String, children: &dyn Fn(&T) -> Option<&[T]>) {
        let max_depth = self.max_depth_limit();
        let mut stack = vec![Emit::List(self.items, 1)];

        while let Some(emit) = stack.pop() {
            match emit {
                Emit::List(items, depth) => {
                    let mut list = Tag::new("ul");
                    list.merge_attributes(&self.options.child_attributes);
                    list.write_start(out);
                    stack.push(Emit::CloseList);
                    stack.extend(items.iter().rev().map(|item| Emit::Item(item, depth)));
                }
                Emit::Item(item, depth) => {
                    self.item_tag(item).write_start(out);
                    out.push_str(&self.item_content(item));
                    stack.push(Emit::CloseItem);
                    match children(item) {
                        Some(kids) if !kids.is_empty() && depth >= max_depth => {
                            warn!("depth limit {} reached while rendering, {} children cut", depth, kids.len());
                        }
                        Some(kids) if !kids.is_empty() => stack.push(Emit::List(kids, depth + 1)),
                        _ => {}
                    }
                }
                Emit::CloseItem => out.push_str("</li>"),
                Emit::CloseList => out.push_str("</ul>"),
            }
        }
    }

    fn item_tag(&self, item: &T) -> Tag {
        let mut li = Tag::new("li");
        for (attribute, value) in project_attributes(item) {
            li.merge_attribute(attribute, value);
        }
        li.merge_attribute(MARKER_ATTRIBUTE, MARKER_ATTRIBUTE);
        li
    }

    fn item_content(&self, item: &T) -> String {
        match &self.item_template {
            Some(template) => template(item),
            None => escape_html(&self.display_text(item)),
        }
    }

    fn display_text(&self, item: &T) -> String {
        match &self.display_text {
            Some(selector) => selector(item),
            None => item.text(),
        }
    }

    /// Flat records and selected ids, pre-order, honouring the depth cap.
    fn payloads(&self, children: &dyn Fn(&T) -> Option<&[T]>) -> (String, String) {
        let max_depth = self.max_depth_limit();
        let mut records = Vec::new();
        let mut selected = Vec::new();
        let mut stack: Vec<(&T, usize)> = self.items.iter().rev().map(|item| (item, 1)).collect();

        while let Some((item, depth)) = stack.pop() {
            let record = flat_record(item);
            if record.get("selected").and_then(Value::as_bool) == Some(true) {
                if let Some(id) = record.get("id") {
                    selected.push(id.clone());
                }
            }
            records.push(Value::Object(record));
            if depth < max_depth {
                if let Some(kids) = children(item) {
                    stack.extend(kids.iter().rev().map(|kid| (kid, depth + 1)));
                }
            }
        }

        (
            Value::Array(records).to_string(),
            Value::Array(selected).to_string(),
        )
    }
}

fn hidden_input(name: &'static str, value: String) -> Tag {
    Tag::new("input")
        .with_attribute("id", name)
        .with_attribute("name", name)
        .with_attribute("type", "hidden")
        .with_attribute("value", value)
}

/// Render a built forest with the given settings.
pub fn render_forest(roots: &[Node], options: &RenderOptions) -> Result<String, DomainError> {
    TreeView::new(roots)
        .children(|node: &Node| Some(node.children.as_slice()))
        .options(options.clone())
        .render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HIDDEN_FIELDS: &str = concat!(
        r#"<input id="treeHidden" name="treeHidden" type="hidden" value="" />"#,
        r#"<input id="treeHiddenSelected" name="treeHiddenSelected" type="hidden" value="" />"#
    );

    fn forest() -> Vec<Node> {
        let mut root = Node::new(1, "root");
        root.children
            .push(Node::new(2, "child").with_parent(1).with_description("first"));
        vec![root]
    }

    #[test]
    fn given_empty_items_when_rendering_then_only_placeholder() {
        let items: Vec<Node> = Vec::new();

        let html = TreeView::new(&items)
            .children(|n: &Node| Some(n.children.as_slice()))
            .render()
            .unwrap();

        assert_eq!(
            html,
            format!(
                r#"<div><div id="jstree"><ul><li id="-1">No children</li></ul></div>{}</div>"#,
                HIDDEN_FIELDS
            )
        );
        assert!(!html.contains("treeJsElement"));
    }

    #[test]
    fn given_no_children_accessor_when_rendering_then_configuration_error() {
        let items = forest();

        let err = TreeView::new(&items).render().unwrap_err();

        assert_eq!(err, DomainError::Configuration { option: "children" });
    }

    #[test]
    fn given_nested_nodes_when_rendering_then_children_nest_inside_parent_item() {
        let items = forest();

        let html = render_forest(&items, &RenderOptions::default()).unwrap();

        let expected_tree = concat!(
            r#"<ul>"#,
            r#"<li data-description="" data-parentId="" data-title="root" id="1" treeJsElement="treeJsElement">root"#,
            r#"<ul>"#,
            r#"<li data-description="first" data-parentId="1" data-title="child" id="2" treeJsElement="treeJsElement">child</li>"#,
            r#"</ul>"#,
            r#"</li>"#,
            r#"</ul>"#,
        );
        assert!(html.contains(expected_tree), "unexpected markup: {}", html);
    }

    #[test]
    fn given_sort_order_when_projecting_then_maps_to_priority() {
        let node = Node::new(9, "n").with_sort_order(3);

        let attributes = project_attributes(&node);

        assert_eq!(attributes.get("priority").map(String::as_str), Some("3"));
        assert!(!attributes.contains_key("selected"));
    }

    #[test]
    fn given_untyped_object_when_projecting_then_matches_names_case_insensitively() {
        let item = json!({
            "ID": 4,
            "Title": "loose",
            "Description": null,
            "parent_id": 2,
            "SortOrder": 1,
            "children": []
        });

        let attributes = project_attributes(&item);

        assert_eq!(attributes.get("id").map(String::as_str), Some("4"));
        assert_eq!(attributes.get("data-title").map(String::as_str), Some("loose"));
        assert_eq!(attributes.get("data-description").map(String::as_str), Some(""));
        assert_eq!(attributes.get("data-parentId").map(String::as_str), Some("2"));
        assert_eq!(attributes.get("priority").map(String::as_str), Some("1"));
    }

    #[test]
    fn given_markup_in_title_when_rendering_with_default_template_then_escaped() {
        let items = vec![Node::new(1, "<b>bold</b>")];

        let html = render_forest(&items, &RenderOptions::default()).unwrap();

        assert!(html.contains(r#"data-title="&lt;b&gt;bold&lt;/b&gt;""#));
        assert!(html.contains(">&lt;b&gt;bold&lt;/b&gt;</li>"));
    }

    #[test]
    fn given_item_template_when_rendering_then_inserted_verbatim() {
        let items = forest();

        let html = TreeView::new(&items)
            .children(|n: &Node| Some(n.children.as_slice()))
            .item_template(|n: &Node| format!("<span>{}</span>", n.id))
            .render()
            .unwrap();

        assert!(html.contains("<span>1</span>"));
        assert!(html.contains("<span>2</span>"));
    }

    #[test]
    fn given_attribute_maps_when_rendering_then_merged_on_lists() {
        let items = forest();
        let root_attrs = BTreeMap::from([("class".to_string(), "tree".to_string())]);
        let child_attrs = BTreeMap::from([("class".to_string(), "branch".to_string())]);

        let html = TreeView::new(&items)
            .children(|n: &Node| Some(n.children.as_slice()))
            .html_attributes(root_attrs)
            .children_html_attributes(child_attrs)
            .render()
            .unwrap();

        assert!(html.contains(r#"<div id="jstree"><ul class="tree"><li id="-1">"#));
        assert_eq!(html.matches(r#"<ul class="branch">"#).count(), 2);
    }

    #[test]
    fn given_max_depth_when_rendering_then_deeper_items_are_cut() {
        let items = forest();

        let html = TreeView::new(&items)
            .children(|n: &Node| Some(n.children.as_slice()))
            .max_depth(1)
            .render()
            .unwrap();

        assert!(html.contains(r#"id="1""#));
        assert!(!html.contains(r#"id="2""#));
    }

    #[test]
    fn given_embed_payload_when_rendering_then_hidden_fields_carry_flat_json() {
        let mut items = forest();
        items[0].children[0].selected = true;

        let html = TreeView::new(&items)
            .children(|n: &Node| Some(n.children.as_slice()))
            .embed_payload(true)
            .render()
            .unwrap();

        assert!(html.contains(r#"name="treeHiddenSelected" type="hidden" value="[2]""#));
        assert!(html.contains("&quot;parentId&quot;:1"));
        assert!(!html.contains("&quot;children&quot;"));
    }

    #[test]
    fn given_json_values_when_rendering_then_children_accessor_walks_them() {
        let items = vec![json!({
            "id": 1,
            "title": "root",
            "children": [{"id": 2, "title": "leaf", "parentId": 1}]
        })];

        let html = TreeView::new(&items)
            .children(|v: &Value| v.get("children").and_then(Value::as_array).map(Vec::as_slice))
            .item_text(|v: &Value| v["title"].as_str().unwrap_or_default().to_string())
            .render()
            .unwrap();

        assert!(html.contains(r#"data-parentId="1" data-title="leaf" id="2""#));
        assert!(html.contains(">leaf</li>"));
    }
}
