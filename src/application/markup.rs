//! Minimal HTML tag builder.
//!
//! Attributes are kept sorted by name so output is deterministic, and
//! merging never replaces an attribute that is already set.

use std::collections::BTreeMap;

/// A single HTML element under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: &'static str,
    attributes: BTreeMap<String, String>,
}

impl Tag {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: BTreeMap::new(),
        }
    }

    /// Set `key` unless it is already present.
    pub fn merge_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes
            .entry(key.into())
            .or_insert_with(|| value.into());
    }

    pub fn merge_attributes<'m, I>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = (&'m String, &'m String)>,
    {
        for (key, value) in attributes {
            self.merge_attribute(key.as_str(), value.as_str());
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.merge_attribute(key, value);
        self
    }

    pub fn write_start(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.name);
        self.write_attributes(out);
        out.push('>');
    }

    pub fn write_end(&self, out: &mut String) {
        out.push_str("</");
        out.push_str(self.name);
        out.push('>');
    }

    pub fn write_self_closing(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.name);
        self.write_attributes(out);
        out.push_str(" />");
    }

    fn write_attributes(&self, out: &mut String) {
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(&escape_html(key));
            out.push_str("=\"");
            out.push_str(&escape_html(value));
            out.push('"');
        }
    }
}

/// Escape special HTML characters.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}
