//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/treeview/treeview.toml`
//! 3. Local config: file given with `--config`
//! 4. Environment variables: `TREEVIEW_*` prefix, `__` between section and key

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{ApplicationError, RenderOptions};
use crate::domain::{BuildOptions, DEFAULT_MAX_DEPTH};

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "TREEVIEW";

/// Builder settings (the `build` config section).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildSettings {
    /// Nodes at this depth keep no children
    pub max_depth: usize,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Raw render section; `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawRenderSettings {
    pub empty_content: Option<String>,
    pub max_depth: Option<usize>,
    pub embed_payload: Option<bool>,
    pub root_attributes: Option<BTreeMap<String, String>>,
    pub child_attributes: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawBuildSettings {
    pub max_depth: Option<usize>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub render: RawRenderSettings,
    pub build: RawBuildSettings,
}

/// Unified configuration for treeview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    /// Renderer defaults
    pub render: RenderOptions,
    /// Builder limits
    pub build: BuildSettings,
}

/// Get the XDG config directory for treeview.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "treeview").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("treeview.toml"))
}

/// Environment source for `TREEVIEW_*` overrides.
pub fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Overlay attribute maps key by key.
fn merge_attributes(
    base: &BTreeMap<String, String>,
    overlay: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut merged = base.clone();
    if let Some(overlay) = overlay {
        merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

impl Settings {
    /// Options for [`crate::domain::TreeBuilder::with_options`].
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            max_depth: self.build.max_depth,
        }
    }

    /// Merge overlay config onto self (base).
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - Attribute maps: merged by key, overlay wins per key
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let render = &overlay.render;
        Self {
            render: RenderOptions {
                empty_content: render
                    .empty_content
                    .clone()
                    .unwrap_or_else(|| self.render.empty_content.clone()),
                max_depth: render.max_depth.unwrap_or(self.render.max_depth),
                embed_payload: render.embed_payload.unwrap_or(self.render.embed_payload),
                root_attributes: merge_attributes(
                    &self.render.root_attributes,
                    render.root_attributes.as_ref(),
                ),
                child_attributes: merge_attributes(
                    &self.render.child_attributes,
                    render.child_attributes.as_ref(),
                ),
            },
            build: BuildSettings {
                max_depth: overlay.build.max_depth.unwrap_or(self.build.max_depth),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Optional config file given on the command line; it must exist
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_layers(global_config_path().as_deref(), local, env_source())
    }

    /// Load settings from explicit layers.
    ///
    /// A missing global file is skipped, a missing local file is an error.
    pub fn load_layers(
        global: Option<&Path>,
        local: Option<&Path>,
        env: Environment,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global {
            if global_path.exists() {
                debug!("load: global config {}", global_path.display());
                current = current.merge_with(&load_raw_settings(global_path)?);
            }
        }

        if let Some(local_path) = local {
            if !local_path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", local_path.display()),
                });
            }
            debug!("load: local config {}", local_path.display());
            current = current.merge_with(&load_raw_settings(local_path)?);
        }

        Self::apply_env_overrides(current, env)
    }

    /// Apply TREEVIEW_* environment variables as explicit overrides.
    fn apply_env_overrides(settings: Self, env: Environment) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(env)
            .build()
            .map_err(config_err)?;

        let mut raw = RawSettings::default();
        if let Ok(val) = config.get_string("render.empty_content") {
            raw.render.empty_content = Some(val);
        }
        raw.render.max_depth = optional(config.get::<usize>("render.max_depth"))?;
        raw.render.embed_payload = optional(config.get_bool("render.embed_payload"))?;
        raw.render.root_attributes =
            optional(config.get::<BTreeMap<String, String>>("render.root_attributes"))?;
        raw.render.child_attributes =
            optional(config.get::<BTreeMap<String, String>>("render.child_attributes"))?;
        raw.build.max_depth = optional(config.get::<usize>("build.max_depth"))?;

        Ok(settings.merge_with(&raw))
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# treeview configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/treeview/treeview.toml
#   Local:  file passed with --config (or TREEVIEW_CONFIG)
#   Env:    TREEVIEW_<SECTION>__<KEY>, e.g. TREEVIEW_RENDER__EMPTY_CONTENT
#
# Attribute tables merge key by key, later layers win per key.

[render]
# Markup of the root placeholder item
# empty_content = "No children"

# Items at this depth render without their children
# max_depth = 256

# Pre-fill the hidden postback fields with the current payload
# embed_payload = false

[render.root_attributes]
# class = "tree"

[render.child_attributes]
# class = "subtree"

[build]
# Nodes at this depth keep no children
# max_depth = 256
"#
        .to_string()
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }
}

/// A key that is absent is fine, a key that does not convert is not.
fn optional<T>(value: Result<T, ConfigError>) -> Result<Option<T>, ApplicationError> {
    match value {
        Ok(v) => Ok(Some(v)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(config_err(e)),
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
