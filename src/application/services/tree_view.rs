//! Tree view service
//!
//! Drives builder, renderer and binder over payload files.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::application::binder::TreeBinder;
use crate::application::renderer::render_forest;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{Diagnostic, Forest, Node, TreeBuilder};
use crate::infrastructure::traits::FileSystem;

/// Output from rendering a payload file.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// Complete markup including the hidden postback fields
    pub html: String,
    /// Problems found while building the forest
    pub diagnostics: Vec<Diagnostic>,
}

/// Service for building, rendering and binding tree payloads.
pub struct TreeViewService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl TreeViewService {
    /// Create a new tree view service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Builder configured from the `build` settings section.
    pub fn builder(&self) -> TreeBuilder {
        TreeBuilder::with_options(self.settings.build_options())
    }

    /// Read a JSON array of nodes. Nested `children` are kept as given.
    #[instrument(level = "debug", skip(self))]
    pub fn load_nodes(&self, path: &Path) -> ApplicationResult<Vec<Node>> {
        let content = self.read(path)?;
        let nodes: Vec<Node> = serde_json::from_str(&content)
            .map_err(|e| ApplicationError::parse(path.display().to_string(), e))?;
        debug!("load_nodes: {} nodes", nodes.len());
        Ok(nodes)
    }

    /// Build a forest from a flat payload file.
    #[instrument(level = "debug", skip(self))]
    pub fn build(&self, path: &Path) -> ApplicationResult<Forest> {
        let nodes = self.load_nodes(path)?;
        let forest = self.builder().build(nodes);
        log_diagnostics(&forest.diagnostics);
        Ok(forest)
    }

    /// Build and render a flat payload file with the `render` settings section.
    #[instrument(level = "debug", skip(self))]
    pub fn render(&self, path: &Path) -> ApplicationResult<RenderOutput> {
        let forest = self.build(path)?;
        let html = render_forest(&forest.roots, &self.settings.render)?;
        Ok(RenderOutput {
            html,
            diagnostics: forest.diagnostics,
        })
    }

    /// Bind a node payload file and a selected-ids payload file.
    #[instrument(level = "debug", skip(self))]
    pub fn bind(&self, nodes_path: &Path, selected_path: &Path) -> ApplicationResult<Forest> {
        let flat_json = self.read(nodes_path)?;
        let selected_json = self.read(selected_path)?;
        let forest = TreeBinder::with_builder(self.builder()).bind(&flat_json, &selected_json)?;
        log_diagnostics(&forest.diagnostics);
        Ok(forest)
    }

    /// Flatten a nested forest file into pre-order flat nodes.
    #[instrument(level = "debug", skip(self))]
    pub fn flatten(&self, path: &Path) -> ApplicationResult<Vec<Node>> {
        let forest = self.load_nodes(path)?;
        Ok(TreeBuilder::flatten(&forest))
    }

    /// Write rendered output to a file.
    pub fn write_output(&self, path: &Path, content: &str) -> ApplicationResult<()> {
        self.fs
            .write(path, content)
            .with_path_context("write output", path)
    }

    fn read(&self, path: &Path) -> ApplicationResult<String> {
        self.fs
            .read_to_string(path)
            .with_path_context("read payload", path)
    }
}

fn log_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        match diagnostic {
            Diagnostic::Orphan { .. } => debug!("{}", diagnostic),
            _ => warn!("{}", diagnostic),
        }
    }
}
