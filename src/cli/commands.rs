//! Command dispatch
//!
//! Every layout command imports the layout into fresh in-memory
//! repositories, so `mv` and `rm` only preview their effect.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::application::services::DocumentWithNode;
use crate::application::RepositoryResultExt;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{DocumentTree, NodeId, TreeRender};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|e| InfraError::io("current dir", e))?,
    };
    let settings = Settings::load(Some(dir.as_path()))?;
    let container = ServiceContainer::new(settings);

    match &cli.command {
        Some(Commands::Tree) => cmd_tree(&container, cli),
        Some(Commands::Paths) => cmd_paths(&container, cli),
        Some(Commands::Docs { under }) => cmd_docs(&container, cli, under.as_deref()),
        Some(Commands::Mv {
            source,
            dest,
            order,
        }) => cmd_mv(&container, cli, source, dest, *order),
        Some(Commands::Rm {
            path,
            with_documents,
        }) => cmd_rm(&container, cli, path, *with_documents),
        Some(Commands::Config { command }) => cmd_config(&container, &dir, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "doctree", &mut io::stdout());
            Ok(())
        }
        None => Ok(()),
    }
}

/// Import the layout selected on the command line or in config.
fn load_tree(container: &ServiceContainer, cli: &Cli) -> CliResult<DocumentTree> {
    let path: PathBuf = cli
        .layout
        .clone()
        .or_else(|| container.settings.layout.clone())
        .ok_or_else(|| {
            CliError::Usage("no layout given: pass --layout or set `layout` in config".into())
        })?;
    let owner = container.settings.owner_id()?.unwrap_or_default();
    debug!("load_tree: layout={}, owner={}", path.display(), owner);

    let layout = container.layout_service.load(&path)?;
    Ok(container.layout_service.import(&layout, owner)?)
}

fn resolve(tree: &DocumentTree, path: &str) -> CliResult<NodeId> {
    tree.find_by_path(path)
        .ok_or_else(|| CliError::InvalidArgs(format!("no node at path '{}'", path)))
}

fn print_tree(container: &ServiceContainer, tree: &DocumentTree) -> CliResult<()> {
    let options = container.settings.render_options();
    let mut out = io::stdout().lock();
    for rendered in tree.to_tree_strings(options) {
        write!(out, "{}", rendered).map_err(|e| InfraError::io("write tree", e))?;
    }
    Ok(())
}

#[instrument(level = "debug", skip_all)]
fn cmd_tree(container: &ServiceContainer, cli: &Cli) -> CliResult<()> {
    let tree = load_tree(container, cli)?;
    print_tree(container, &tree)
}

#[instrument(level = "debug", skip_all)]
fn cmd_paths(container: &ServiceContainer, cli: &Cli) -> CliResult<()> {
    let tree = load_tree(container, cli)?;
    for root in tree.roots() {
        for id in tree.subtree_ids(root.id())? {
            let node = tree.node(id)?;
            output::info(&format!(
                "{} {} {}",
                tree.level(id)?,
                tree.path(id)?,
                output::dim(&node.node_type())
            ));
        }
    }
    Ok(())
}

#[instrument(level = "debug", skip_all)]
fn cmd_docs(container: &ServiceContainer, cli: &Cli, under: Option<&str>) -> CliResult<()> {
    let tree = load_tree(container, cli)?;
    let service = &container.tree_service;

    let mut entries = Vec::new();
    match under {
        Some(path) => {
            let parent = resolve(&tree, path)?;
            entries.extend(service.get_document_nodes_with_content(&tree, parent)?);
        }
        None => {
            for root in tree.roots() {
                // Root-level document nodes are not descendants of anything
                if let Some(document_id) = root.document_id() {
                    if let Some(document) = container
                        .documents
                        .get(document_id)
                        .with_entity_context("get document", document_id)?
                    {
                        entries.push(DocumentWithNode {
                            node: root.clone(),
                            document,
                        });
                    }
                }
                entries.extend(service.get_document_nodes_with_content(&tree, root.id())?);
            }
        }
    }

    for entry in &entries {
        output::info(&format!(
            "{}  {} {}",
            tree.path(entry.node.id())?,
            entry.document.title(),
            output::dim(&format!("({})", entry.document.status()))
        ));
    }
    Ok(())
}

#[instrument(level = "debug", skip(container, cli))]
fn cmd_mv(
    container: &ServiceContainer,
    cli: &Cli,
    source: &str,
    dest: &str,
    order: i32,
) -> CliResult<()> {
    let mut tree = load_tree(container, cli)?;
    let node = resolve(&tree, source)?;
    let parent = match dest.trim_matches('/') {
        "" => None,
        path => Some(resolve(&tree, path)?),
    };

    tree.move_node(node, parent, order)?;

    output::success(&format!("moved to {}", tree.path(node)?));
    print_tree(container, &tree)
}

#[instrument(level = "debug", skip(container, cli))]
fn cmd_rm(
    container: &ServiceContainer,
    cli: &Cli,
    path: &str,
    with_documents: bool,
) -> CliResult<()> {
    let mut tree = load_tree(container, cli)?;
    let node = resolve(&tree, path)?;

    let report = container
        .tree_service
        .delete_document_node(&mut tree, node, with_documents)?;

    output::success(&format!(
        "removed {} node(s), deleted {} document(s)",
        report.removed_nodes.len(),
        report.deleted_documents.len()
    ));
    for id in &report.deleted_documents {
        output::removed(&format!("document {}", id));
    }
    print_tree(container, &tree)
}

fn cmd_config(container: &ServiceContainer, dir: &Path, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::header("Merged settings");
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Path => {
            let describe = |path: &Path| {
                let state = if path.exists() { "exists" } else { "missing" };
                format!("{} {}", path.display(), output::dim(&format!("({})", state)))
            };
            output::header("Config files");
            match global_config_path() {
                Some(path) => output::detail(&format!("global: {}", describe(&path))),
                None => output::detail("global: <no config directory>"),
            }
            output::detail(&format!("local:  {}", describe(&local_config_path(dir))));
        }
    }
    Ok(())
}
