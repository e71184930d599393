//! Domain layer: entities and tree reconstruction
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;

pub use arena::{ArenaNode, NodeArena};
pub use builder::{build, flatten, BuildOptions, TreeBuilder, DEFAULT_MAX_DEPTH};
pub use entities::{Diagnostic, Forest, Node, NODES_FIELD, SELECTED_FIELD};
pub use error::DomainError;
