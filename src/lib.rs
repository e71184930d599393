//! Hierarchical tree widget support.
//!
//! Rebuilds forests from flat parent-referenced records, renders them as a
//! nested HTML list with hidden postback fields, and binds the postback back
//! into a forest with selection applied.
//!
//! Layers, innermost first: [`domain`] (entities and tree reconstruction),
//! [`application`] (renderer, binder, services), [`infrastructure`] (I/O and
//! wiring), [`cli`].

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use application::{RenderOptions, TreeBinder, TreeItem, TreeView};
pub use domain::{Diagnostic, Forest, Node, TreeBuilder};
