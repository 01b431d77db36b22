//! Output types for renderer consumption.
//!
//! These structs are serialized to camelCase JSON and handed to whatever
//! draws the diagram (the wasm front end, or a native SVG writer).

use std::collections::HashSet;

use serde::Serialize;

use crate::config::DiagramConfig;
use crate::edges::{Curve, Edge};
use crate::layout::{LaidOutTree, NodeIndex};
use crate::process::color::LegendEntry;

/// A positioned circle ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutput {
    pub path: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub depth: usize,
    pub label: String,
    pub color: String,
    pub is_parent: bool,
    /// The synthetic group of top-level files.
    pub is_loose: bool,
    /// False when highlighting is active and nothing in this subtree is highlighted.
    pub emphasized: bool,
}

/// An import connector between two rendered files
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeOutput {
    pub from_path: String,
    pub to_path: String,
    pub curve: Curve,
    pub color: String,
}

impl From<Edge> for EdgeOutput {
    fn from(edge: Edge) -> Self {
        Self {
            from_path: edge.origin_path,
            to_path: edge.target_path,
            curve: edge.curve,
            color: edge.color,
        }
    }
}

/// Error information for the host page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
}

/// The combined output sent to the renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiagramOutput {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<EdgeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Vec<LegendEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl DiagramOutput {
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(ErrorInfo { message: message.into() }),
            ..Self::default()
        }
    }
}

/// Flatten the rendered part of a settled tree, in render order.
pub fn node_outputs(
    tree: &LaidOutTree,
    rendered: &[NodeIndex],
    config: &DiagramConfig,
) -> Vec<NodeOutput> {
    let emphasized = emphasis(tree, config);
    rendered
        .iter()
        .map(|&idx| {
            let node = tree.node(idx);
            NodeOutput {
                path: node.data.path.clone(),
                x: node.x,
                y: node.y,
                radius: node.radius,
                depth: node.depth,
                label: node.data.label.clone(),
                color: node.data.color.clone(),
                is_parent: !node.is_leaf(),
                is_loose: node.data.is_loose,
                emphasized: emphasized.contains(&idx),
            }
        })
        .collect()
}

/// Nodes that are highlighted themselves or have a highlighted descendant.
/// Everything counts as emphasized when nothing is highlighted.
fn emphasis(tree: &LaidOutTree, config: &DiagramConfig) -> HashSet<NodeIndex> {
    if config.highlighted_paths.is_empty() {
        return (0..tree.len()).map(NodeIndex).collect();
    }
    let mut out = HashSet::new();
    for idx in tree.post_order() {
        let node = tree.node(idx);
        if config.is_highlighted(&node.data.path) || node.children.iter().any(|c| out.contains(c)) {
            out.insert(idx);
        }
    }
    out
}
