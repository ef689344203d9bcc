use crate::config::{load_templates, Config};
use anyhow::Result;
use bunnyhop_model::{NodeId, NodeIndex, NodeModel, UndoLog};
use clap::Args;
use colored::Colorize;
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Node template to instantiate
    pub node_id: String,

    /// Template files to use instead of the configured ones
    #[arg(short, long)]
    pub templates: Vec<PathBuf>,

    /// Also build the manual imitation of the node
    #[arg(short, long)]
    pub imitate: bool,
}

pub fn tree(args: TreeArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let templates = if args.templates.is_empty() {
        config.load_templates(cwd)?
    } else {
        load_templates(&args.templates)?
    };

    let mut model = NodeModel::new(Arc::new(templates));
    let mut log = UndoLog::with_max_levels(config.undo_levels);
    let workspace = model.add_workspace("main");

    log.begin_batch();
    let node = model.create_node(&NodeId::from(args.node_id.as_str()))?;
    model.add_root_node(workspace, node, &mut log)?;
    if args.imitate {
        model.create_imitation_manually(node, &mut log)?;
    }
    log.end_batch();

    for &root in model.workspace(workspace).roots() {
        println!("{}", format!("── root {root}").bright_blue().bold());
        print!("{}", render_tree(&model, root));
        println!();
    }
    Ok(())
}

/// Indented outline of the subtree under `root`
pub fn render_tree(model: &NodeModel, root: NodeIndex) -> String {
    let mut out = String::new();
    render_node(model, root, None, "", &mut out);
    out
}

fn render_node(model: &NodeModel, index: NodeIndex, slot: Option<&str>, indent: &str, out: &mut String) {
    let node = model.node(index);
    let _ = write!(out, "{indent}");
    if let Some(slot) = slot.filter(|slot| !slot.is_empty()) {
        let _ = write!(out, "{slot}: ");
    }
    let label = if node.name().is_empty() { node.id().as_str() } else { node.name() };
    let _ = write!(out, "{label} [{}] {index}", node.id());
    if let Some(text) = node.text() {
        let _ = write!(out, " {text:?}");
    }
    if node.is_default_node() {
        let _ = write!(out, " (default)");
    }
    if let Some(original) = node.original() {
        let _ = write!(out, " imitates {original}");
    }
    out.push('\n');

    let child_indent = format!("{indent}  ");
    for &connector in node.connectors() {
        let slot = model.connector(connector);
        if let Some(child) = slot.connected_node() {
            render_node(model, child, Some(slot.name()), &child_indent, out);
        }
    }
}
