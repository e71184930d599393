//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Hierarchical tree widget: rebuild forests from flat records, render HTML, bind postbacks
#[derive(Parser, Debug)]
#[command(name = "treeview")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output on stderr (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Local config file, layered over the global one
    #[arg(short, long, global = true, env = "TREEVIEW_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render flat nodes as HTML with hidden postback fields
    Render {
        /// JSON array of flat nodes
        #[arg(value_hint = ValueHint::FilePath)]
        nodes: PathBuf,

        /// Write HTML to this file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Pre-fill the hidden postback fields
        #[arg(long)]
        embed: bool,
    },

    /// Rebuild the hierarchy and print it as nested JSON
    Build {
        /// JSON array of flat nodes
        #[arg(value_hint = ValueHint::FilePath)]
        nodes: PathBuf,

        /// Fail on cycles instead of reporting them
        #[arg(long)]
        strict: bool,
    },

    /// Bind a postback: flat nodes plus selected ids
    Bind {
        /// JSON array of flat nodes (`treeHidden`)
        #[arg(value_hint = ValueHint::FilePath)]
        nodes: PathBuf,

        /// JSON array of selected ids (`treeHiddenSelected`)
        #[arg(value_hint = ValueHint::FilePath)]
        selected: PathBuf,
    },

    /// Flatten a nested forest into pre-order flat nodes
    Flatten {
        /// JSON array of nested nodes
        #[arg(value_hint = ValueHint::FilePath)]
        forest: PathBuf,
    },

    /// Show the rebuilt hierarchy as a text tree
    Tree {
        /// JSON array of flat nodes
        #[arg(value_hint = ValueHint::FilePath)]
        nodes: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config instead of ./treeview.toml
        #[arg(short, long)]
        global: bool,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show config paths
    Path,
}
