// Hierarchical circle packing.
//
// Goals:
// - Deterministic: sibling order is fixed by (sortOrder desc, name desc)
// - Containment: every child circle lies inside its parent's circle
// - No overlap between siblings
// - Leaf radius grows with the square root of its packing value
//
// Packing runs in two passes. The first packs without padding to learn the
// unscaled root radius; the second packs again with padding expressed in
// those units, so the padding comes out right after scaling to the canvas.
//
// Submodules:
// - siblings: front-chain packing of one sibling group
// - enclose: smallest enclosing circle
// - spatial_grid: collision candidate lookup
// - stabilize: cache-anchored relaxation after packing
//
// Output:
// - LaidOutTree, an arena of nodes in canvas coordinates.

use std::collections::VecDeque;
use std::ops::{Add, Sub};

use serde::Serialize;

use crate::process::ProcessedNode;
use crate::process::value::MIN_PACKING_VALUE;

pub mod enclose;
mod siblings;
mod spatial_grid;
pub mod stabilize;

use siblings::pack_siblings;

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Circle {
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub usize);

#[derive(Debug, Clone)]
pub struct LaidOutNode {
    /// Annotated source node. Its `children` are moved into the arena.
    pub data: ProcessedNode,
    pub depth: usize,
    /// Edges to the deepest leaf below.
    pub height: usize,
    /// Sum of leaf values below (own value for leaves).
    pub value: f64,
    pub radius: f64,
    pub x: f64,
    pub y: f64,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
}

impl LaidOutNode {
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn circle(&self) -> Circle {
        Circle { x: self.x, y: self.y, r: self.radius }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LaidOutTree {
    pub nodes: Vec<LaidOutNode>,
    pub root: NodeIndex,
}

impl LaidOutTree {
    /// Flatten a processed tree into an arena, children sorted for packing.
    pub fn from_processed(root: ProcessedNode) -> Self {
        fn insert(
            nodes: &mut Vec<LaidOutNode>,
            mut data: ProcessedNode,
            depth: usize,
            parent: Option<NodeIndex>,
        ) -> NodeIndex {
            let mut kids = data.children.take().unwrap_or_default();
            kids.sort_by(|a, b| {
                b.sort_order
                    .total_cmp(&a.sort_order)
                    .then_with(|| b.name.cmp(&a.name))
            });

            let idx = NodeIndex(nodes.len());
            nodes.push(LaidOutNode {
                value: data.value,
                data,
                depth,
                height: 0,
                radius: 0.0,
                x: 0.0,
                y: 0.0,
                parent,
                children: Vec::with_capacity(kids.len()),
            });
            for kid in kids {
                let child = insert(nodes, kid, depth + 1, Some(idx));
                nodes[idx.0].children.push(child);
            }
            idx
        }

        let mut nodes = Vec::new();
        let root = insert(&mut nodes, root, 0, None);
        Self { nodes, root }
    }

    pub fn node(&self, idx: NodeIndex) -> &LaidOutNode {
        &self.nodes[idx.0]
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> &mut LaidOutNode {
        &mut self.nodes[idx.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children before parent.
    pub fn post_order(&self) -> Vec<NodeIndex> {
        fn dfs(tree: &LaidOutTree, idx: NodeIndex, out: &mut Vec<NodeIndex>) {
            for &c in &tree.nodes[idx.0].children {
                dfs(tree, c, out);
            }
            out.push(idx);
        }
        let mut out = Vec::with_capacity(self.nodes.len());
        dfs(self, self.root, &mut out);
        out
    }

    /// Parent before children.
    pub fn pre_order(&self) -> Vec<NodeIndex> {
        fn dfs(tree: &LaidOutTree, idx: NodeIndex, out: &mut Vec<NodeIndex>) {
            out.push(idx);
            for &c in &tree.nodes[idx.0].children {
                dfs(tree, c, out);
            }
        }
        let mut out = Vec::with_capacity(self.nodes.len());
        dfs(self, self.root, &mut out);
        out
    }

    /// Everything strictly below `idx`, parent before children.
    pub fn descendants(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeIndex> = self.nodes[idx.0].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        out
    }

    /// Nodes exposed to rendering: depth 1 through `max_depth`, breadth first.
    pub fn rendered(&self, max_depth: usize) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([self.root]);
        while let Some(idx) = queue.pop_front() {
            let node = &self.nodes[idx.0];
            if node.depth >= 1 {
                out.push(idx);
            }
            if node.depth < max_depth {
                queue.extend(node.children.iter().copied());
            }
        }
        out
    }

    /// Shift every node below `idx` by `delta`. `idx` itself stays put.
    pub fn translate_descendants(&mut self, idx: NodeIndex, delta: Point) {
        if delta.x == 0.0 && delta.y == 0.0 {
            return;
        }
        for d in self.descendants(idx) {
            let node = &mut self.nodes[d.0];
            node.x += delta.x;
            node.y += delta.y;
        }
    }

    pub fn find(&self, path: &str) -> Option<NodeIndex> {
        self.nodes
            .iter()
            .position(|n| n.data.path == path)
            .map(NodeIndex)
    }
}

#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Padding inside the root circle.
    pub root_padding: f64,
    /// Padding inside a parent with more than one leaf child.
    pub leafy_padding: f64,
    /// Padding inside every other parent.
    pub nested_padding: f64,
    /// Relaxation ticks per sibling group.
    pub iterations: usize,
    /// Stop a relaxation early once no body moves farther than this in one tick.
    pub settle_threshold: Option<f64>,
    /// A settled node with more children than this gets its children relaxed too...
    pub reflow_min_children: usize,
    /// ...as long as it is no deeper than this.
    pub reflow_max_depth: usize,
    /// Collision padding at the deepest level.
    pub collide_padding_min: f64,
    /// Collision padding at depth 1.
    pub collide_padding_max: f64,
    /// Gap kept between a relaxed child and its parent's rim.
    pub containment_margin: f64,
    /// Minimum distance an edge ends short of its target's center.
    pub edge_min_gap: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            root_padding: 1.0,
            leafy_padding: 5.0,
            nested_padding: 13.0,
            iterations: 130,
            settle_threshold: None,
            reflow_min_children: 4,
            reflow_max_depth: 3,
            collide_padding_min: 3.0,
            collide_padding_max: 8.0,
            containment_margin: 3.0,
            edge_min_gap: 15.0,
        }
    }
}

/// Pack a processed tree into a `width` x `height` canvas.
///
/// The root circle is centered on the canvas with diameter `min(width, height)`.
/// Positions are absolute canvas coordinates.
pub fn pack(root: ProcessedNode, width: f64, height: f64, cfg: &LayoutConfig) -> LaidOutTree {
    let mut tree = LaidOutTree::from_processed(root);
    let post = tree.post_order();

    for &idx in &post {
        let child_stats = {
            let node = tree.node(idx);
            if node.is_leaf() {
                None
            } else {
                Some(node.children.iter().fold((0.0, 0usize), |(sum, height), &c| {
                    let child = tree.node(c);
                    (sum + child.value, height.max(child.height + 1))
                }))
            }
        };
        let node = tree.node_mut(idx);
        match child_stats {
            Some((sum, height)) => {
                node.value = sum.max(MIN_PACKING_VALUE);
                node.height = height;
            }
            None => {
                node.value = node.value.max(MIN_PACKING_VALUE);
                node.radius = node.value.sqrt();
            }
        }
    }

    for &idx in &post {
        pack_children(&mut tree, idx, 0.0);
    }

    let extent = width.min(height);
    let k = tree.node(tree.root).radius / extent;
    for &idx in &post {
        let padding = padding_for(&tree, idx, cfg) * k;
        pack_children(&mut tree, idx, padding);
    }

    let scale = extent / (2.0 * tree.node(tree.root).radius);
    let root = tree.root;
    {
        let node = tree.node_mut(root);
        node.x = width / 2.0;
        node.y = height / 2.0;
        node.radius *= scale;
    }
    for idx in tree.pre_order() {
        let Some(parent) = tree.node(idx).parent else { continue };
        let origin = tree.node(parent).center();
        let node = tree.node_mut(idx);
        node.radius *= scale;
        node.x = origin.x + scale * node.x;
        node.y = origin.y + scale * node.y;
    }

    tree
}

fn padding_for(tree: &LaidOutTree, idx: NodeIndex, cfg: &LayoutConfig) -> f64 {
    let node = tree.node(idx);
    if idx == tree.root {
        return cfg.root_padding;
    }
    let leaf_children = node.children.iter().filter(|&&c| tree.node(c).is_leaf()).count();
    if leaf_children > 1 {
        cfg.leafy_padding
    } else {
        cfg.nested_padding
    }
}

/// Pack the children of `idx` around the origin and size `idx` to enclose them.
fn pack_children(tree: &mut LaidOutTree, idx: NodeIndex, padding: f64) {
    let children = tree.node(idx).children.clone();
    if children.is_empty() {
        return;
    }

    let mut circles: Vec<Circle> = children
        .iter()
        .map(|&c| Circle { x: 0.0, y: 0.0, r: tree.node(c).radius + padding })
        .collect();
    let enclosing = pack_siblings(&mut circles);

    for (&c, circle) in children.iter().zip(&circles) {
        let child = tree.node_mut(c);
        child.x = circle.x;
        child.y = circle.y;
    }
    tree.node_mut(idx).radius = enclosing + padding;
}
