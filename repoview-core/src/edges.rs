//! Import edges between rendered files.
//!
//! Edges are derived, never stored: every layout recomputes them from the
//! settled positions and the current focus. Only imports that resolve to a
//! rendered leaf produce an edge, and only edges touching the focused path
//! are kept.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::is_within;
use crate::layout::{LaidOutNode, LaidOutTree, NodeIndex, Point};

/// Imports in this namespace point outside the repository.
pub const EXTERNAL_MODULE_PREFIX: &str = "library:";

/// Quadratic curve: one control point between the endpoints.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Curve {
    pub start: Point,
    pub control: Point,
    pub end: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub origin_path: String,
    pub target_path: String,
    pub curve: Curve,
    /// The importing file's color.
    pub color: String,
}

/// Resolve the import edges among `nodes` that touch `focus`.
///
/// `nodes` is the rendered node list; only leaves at depth 1..=`max_depth`
/// act as sources or targets. No focus means no edges.
pub fn resolve_edges(
    tree: &LaidOutTree,
    nodes: &[NodeIndex],
    focus: Option<&str>,
    max_depth: usize,
    min_gap: f64,
) -> Vec<Edge> {
    let Some(focus) = focus else {
        return Vec::new();
    };

    // The loose-files group always has children, so it is never an endpoint.
    let leaves: Vec<&LaidOutNode> = nodes
        .iter()
        .map(|&idx| tree.node(idx))
        .filter(|n| n.is_leaf() && (1..=max_depth).contains(&n.depth))
        .collect();

    // Exact paths win over extensionless matches.
    let mut targets: HashMap<&str, &LaidOutNode> = HashMap::new();
    for &leaf in &leaves {
        targets.insert(leaf.data.path.as_str(), leaf);
    }
    for &leaf in &leaves {
        targets
            .entry(leaf.data.path_without_extension.as_str())
            .or_insert(leaf);
    }

    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut edges = Vec::new();
    for &source in &leaves {
        for import in &source.data.imports {
            let Some(target) = resolve_target(&import.module_name, &targets) else {
                continue;
            };
            let (from, to) = (source.data.path.as_str(), target.data.path.as_str());
            if from == to || !(is_within(from, focus) || is_within(to, focus)) {
                continue;
            }
            if !seen.insert((from, to)) {
                continue;
            }
            edges.push(Edge {
                origin_path: from.to_string(),
                target_path: to.to_string(),
                curve: curve_between(source, target, min_gap),
                color: source.data.color.clone(),
            });
        }
    }
    edges
}

fn resolve_target<'a>(
    module_name: &str,
    targets: &HashMap<&str, &'a LaidOutNode>,
) -> Option<&'a LaidOutNode> {
    if module_name.starts_with(EXTERNAL_MODULE_PREFIX) {
        return None;
    }
    let name = module_name.strip_prefix("./").unwrap_or(module_name);
    targets.get(name).copied()
}

/// Curve from the rim of `from` toward `to`, bending along the dominant axis.
///
/// The end stops short of the target's center by the target's radius, or by
/// `min_gap` for small targets.
pub fn curve_between(from: &LaidOutNode, to: &LaidOutNode, min_gap: f64) -> Curve {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let offset = min_gap.max(to.radius);

    if dy.abs() > dx.abs() {
        let s = if dy >= 0.0 { 1.0 } else { -1.0 };
        let start = Point::new(from.x, from.y + s * from.radius);
        let end = Point::new(to.x, to.y - s * offset);
        Curve { start, control: Point::new(start.x, end.y), end }
    } else {
        let s = if dx >= 0.0 { 1.0 } else { -1.0 };
        let start = Point::new(from.x + s * from.radius, from.y);
        let end = Point::new(to.x - s * offset, to.y);
        Curve { start, control: Point::new(end.x, start.y), end }
    }
}
