//! Application layer: rendering, binding and services
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod binder;
pub mod error;
pub mod error_ext;
pub mod markup;
pub mod renderer;
pub mod services;

pub use binder::{apply_selection, parse_nodes, parse_selected, FormFields, TreeBinder};
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use markup::{escape_html, Tag};
pub use renderer::{
    flat_record, normalize_field_name, project_attributes, render_forest, FieldValue,
    RenderOptions, TreeItem, TreeView,
};
