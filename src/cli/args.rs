//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Document tree: folders and document references over a separate content store
#[derive(Parser, Debug)]
#[command(name = "doctree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Layout file (default: `layout` from config)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub layout: Option<PathBuf>,

    /// Directory holding a local .doctree.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the layout as a tree
    Tree,

    /// List every node path with its level
    Paths,

    /// List document nodes with title and status
    Docs {
        /// Only documents below this folder path
        #[arg(long)]
        under: Option<String>,
    },

    /// Preview moving a node (DEST "/" makes it a root)
    Mv {
        /// Path of the node to move
        source: String,
        /// Path of the new parent folder
        dest: String,
        /// Sibling order at the destination
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        order: i32,
    },

    /// Preview deleting a subtree
    Rm {
        /// Path of the node to delete
        path: String,
        /// Also delete the referenced documents
        #[arg(long)]
        with_documents: bool,
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

    /// Show config paths
    Path,
}
