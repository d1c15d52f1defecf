//! Terminal and JSON output for expanded hierarchies.
//!
//! Labels read `name  kind  file.c @ 12`; include nodes are colored like
//! file names, failures and warnings hang under the node they belong to.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use ptree::TreeBuilder;

use crate::core::hierarchy::{HierarchyNode, HierarchyTree};
use crate::core::kind::SymbolKind;

/// Render as an indented tree. `color` false gives plain text.
pub fn render_tree(tree: &HierarchyTree, color: bool) -> Result<String> {
    let mut builder = TreeBuilder::new(node_label(tree, color));
    add_children(&mut builder, tree, color);

    let mut out = Vec::new();
    ptree::write_tree(&builder.build(), &mut out).context("render hierarchy")?;

    String::from_utf8(out).context("hierarchy output is not UTF-8")
}

/// Render as pretty JSON.
pub fn render_json(tree: &HierarchyTree) -> Result<String> {
    serde_json::to_string_pretty(tree).context("serialize hierarchy")
}

fn add_children(builder: &mut TreeBuilder, tree: &HierarchyTree, color: bool) {
    if let Some(failure) = &tree.failure {
        let text = format!("failed: {failure}");
        builder.add_empty_child(if color { text.red().to_string() } else { text });
    }

    for warning in &tree.warnings {
        let text = format!("warning: {warning}");
        builder.add_empty_child(if color { text.yellow().to_string() } else { text });
    }

    for child in &tree.children {
        let label = node_label(child, color);

        if child.children.is_empty() && child.failure.is_none() && child.warnings.is_empty() {
            builder.add_empty_child(label);
        } else {
            builder.begin_child(label);
            add_children(builder, child, color);
            builder.end_child();
        }
    }
}

fn node_label(tree: &HierarchyTree, color: bool) -> String {
    let node = &tree.node;
    let mut label = format!(
        "{}  {}  {}",
        name_text(node, color),
        kind_text(node.kind, color),
        detail_text(&node.detail, color)
    );

    if tree.recursive {
        let mark = "(recursive)";
        label.push_str("  ");
        label.push_str(&if color { mark.dimmed().to_string() } else { mark.to_string() });
    }
    label
}

fn name_text(node: &HierarchyNode, color: bool) -> String {
    if !color {
        return node.name.clone();
    }

    match node.kind {
        SymbolKind::File => node.name.red().to_string(),
        SymbolKind::Function => node.name.yellow().bold().to_string(),
        SymbolKind::Field | SymbolKind::Constant => node.name.magenta().to_string(),
        SymbolKind::Unclassified => node.name.to_string(),
        _ => node.name.cyan().to_string(),
    }
}

fn kind_text(kind: SymbolKind, color: bool) -> String {
    let text = format!("[{kind}]");
    if color { text.blue().to_string() } else { text }
}

fn detail_text(detail: &str, color: bool) -> String {
    if color { detail.dimmed().to_string() } else { detail.to_string() }
}
