// Cache-anchored relaxation of a packed tree.
//
// Packing alone is unstable: adding one file can rotate a whole sibling group.
// Each sibling group is therefore relaxed with a small force simulation in
// which every body that had a position in the previous layout is
// pulled back toward it, new bodies drift toward the canvas center, and a
// collision pass keeps siblings apart.
//
// Per tick:
// 1. alpha decays toward zero
// 2. the group as a whole is pulled toward the canvas center or its parent
// 3. each body is pulled toward its own target (cached position or center)
// 4. collision passes push overlapping pairs apart
// 5. velocity decays and is applied
// 6. bodies are clamped to the canvas and projected into the parent circle
//
// Bodies that are new, or whose circle grew since the previous layout, give
// way to unchanged ones in collisions. After the last tick a separation pass
// removes whatever overlap the forces left behind.
//
// Once a group settles its subtrees follow rigidly. Large, shallow groups
// then have their own children relaxed the same way, inside the settled
// parent circle.

use std::collections::HashMap;

use log::debug;

use super::enclose::{Lcg, enclose};
use super::spatial_grid::{Bounds, SpatialGrid};
use super::{Circle, LaidOutNode, LaidOutTree, LayoutConfig, NodeIndex, Point};
use crate::config::DiagramConfig;

/// Alpha lost per tick: reaches 0.001 after 300 ticks.
fn alpha_decay() -> f64 {
    1.0 - 0.001_f64.powf(1.0 / 300.0)
}

/// Fraction of velocity kept between ticks.
const VELOCITY_RETAIN: f64 = 0.6;

const GROUP_PULL_X: f64 = 0.01;
const GROUP_PULL_Y: f64 = 0.005;
/// Groups deeper than this are not pulled toward the canvas center.
const GROUP_PULL_MAX_DEPTH: usize = 2;
const PARENT_PULL: f64 = 0.3;
const ANCHOR_PULL: f64 = 0.5;
const FRESH_PULL: f64 = 0.05;
const COLLIDE_PASSES: usize = 3;

/// A cached body counts as grown once its radius exceeds the cached one by 5%.
const GROWTH_TOLERANCE: f64 = 1.05;
/// Upper bound on separation passes; the first half respects yielding.
const SEPARATE_PASSES: usize = 64;
/// Overlap below this is left alone.
const OVERLAP_TOLERANCE: f64 = 1e-6;

/// Positions, radii and sort orders from the previous layout, keyed by path.
///
/// Rebuilt from scratch after every layout; never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionCache {
    pub positions: HashMap<String, Point>,
    pub radii: HashMap<String, f64>,
    pub sort_orders: HashMap<String, f64>,
}

impl PositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every node of a settled tree, rendered or not.
    pub fn from_tree(tree: &LaidOutTree) -> Self {
        let mut cache = Self::default();
        for node in &tree.nodes {
            let path = &node.data.path;
            cache.positions.insert(path.clone(), node.center());
            cache.radii.insert(path.clone(), node.radius);
            cache.sort_orders.insert(path.clone(), node.data.sort_order);
        }
        cache
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.sort_orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn position(&self, path: &str) -> Option<Point> {
        self.positions.get(path).copied()
    }

    pub fn radius(&self, path: &str) -> Option<f64> {
        self.radii.get(path).copied()
    }
}

/// Relax a packed tree toward the cached layout.
///
/// Top-level groups are relaxed against the canvas; the root circle is then
/// recomputed around its settled children so containment holds at every depth.
pub fn stabilize(
    mut tree: LaidOutTree,
    previous: &PositionCache,
    diagram: &DiagramConfig,
    cfg: &LayoutConfig,
) -> LaidOutTree {
    let top_level = tree.node(tree.root).children.clone();
    if top_level.is_empty() {
        return tree;
    }

    let mut stabilizer = Stabilizer {
        cache: previous,
        cfg,
        width: diagram.canvas_width,
        height: diagram.canvas_height,
        max_depth: diagram.max_depth,
        rng: Lcg::new(1),
    };
    stabilizer.reflow(&mut tree, &top_level, Point::default(), None);

    let circles: Vec<Circle> = top_level.iter().map(|&c| tree.node(c).circle()).collect();
    let hull = enclose(&circles);
    let root = tree.root;
    let node = tree.node_mut(root);
    node.x = hull.x;
    node.y = hull.y;
    node.radius = hull.r;
    tree
}

#[derive(Debug, Clone)]
struct Body {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    radius: f64,
    /// Radius plus depth-dependent breathing room.
    collide_radius: f64,
    /// Where this body is pulled to, and how hard.
    target: Point,
    pull: f64,
    /// New or grown since the previous layout: takes the whole correction
    /// when it collides with an unchanged body.
    yields: bool,
}

impl Body {
    fn predicted(&self) -> (f64, f64) {
        (self.x + self.vx, self.y + self.vy)
    }
}

/// The settled parent circle a nested group is relaxed inside.
#[derive(Debug, Copy, Clone)]
struct Frame {
    circle: Circle,
    /// Gap kept between a child and the parent's rim.
    margin: f64,
    /// Offset of the group's centroid from the parent center when packed.
    rest: Point,
}

struct Stabilizer<'a> {
    cache: &'a PositionCache,
    cfg: &'a LayoutConfig,
    width: f64,
    height: f64,
    max_depth: usize,
    rng: Lcg,
}

impl Stabilizer<'_> {
    /// Relax one sibling group, move their subtrees along, and recurse into
    /// large groups.
    ///
    /// `offset` is how far the group's parent moved from its cached position;
    /// cached child positions are shifted by it before use. `parent` is the
    /// settled parent circle, `None` for the top level.
    fn reflow(
        &mut self,
        tree: &mut LaidOutTree,
        group: &[NodeIndex],
        offset: Point,
        parent: Option<Circle>,
    ) {
        let Some(&first) = group.first() else { return };
        let depth = tree.node(first).depth;
        let mut padding = collide_padding(depth, self.max_depth, self.cfg);

        let frame = match parent {
            None => None,
            Some(circle) => {
                // Never ask for more room than the packing left around each child.
                let half_slack = (slack(tree, group, circle) / 2.0).max(0.0);
                padding = padding.min(half_slack);
                let packed = centroid(group.iter().map(|&idx| tree.node(idx).center()));
                Some(Frame {
                    circle,
                    margin: self.cfg.containment_margin.min(half_slack),
                    rest: packed - circle.center(),
                })
            }
        };

        let mut bodies: Vec<Body> = group
            .iter()
            .map(|&idx| self.body(tree.node(idx), offset, frame.is_some(), padding))
            .collect();

        let ticks = self.simulate(&mut bodies, depth, frame.as_ref());
        let passes = self.separate(&mut bodies, frame.as_ref());
        debug!(
            "relaxed {} bodies at depth {} in {} ticks, {} separation passes ({} anchored)",
            bodies.len(),
            depth,
            ticks,
            passes,
            bodies.iter().filter(|b| !b.yields).count()
        );

        for (&idx, body) in group.iter().zip(&bodies) {
            let origin = tree.node(idx).center();
            let settled = Point::new(body.x, body.y);
            tree.translate_descendants(idx, settled - origin);
            let node = tree.node_mut(idx);
            node.x = settled.x;
            node.y = settled.y;
        }

        for &idx in group {
            let node = tree.node(idx);
            if node.children.len() <= self.cfg.reflow_min_children
                || node.depth > self.cfg.reflow_max_depth
            {
                continue;
            }
            let child_offset = match self.cache.position(&node.data.path) {
                Some(cached) => node.center() - cached,
                None => offset,
            };
            let children = node.children.clone();
            let circle = node.circle();
            self.reflow(tree, &children, child_offset, Some(circle));
        }
    }

    /// Seed the body for `node`.
    ///
    /// A cached body is anchored to its cached position shifted by `offset`;
    /// if its circle grew it is only pulled there weakly and yields. Uncached
    /// bodies drift toward the canvas center, or inside a parent toward where
    /// they were packed.
    fn body(&self, node: &LaidOutNode, offset: Point, nested: bool, padding: f64) -> Body {
        let path = &node.data.path;
        let packed = node.center();
        let cached = self.cache.position(path).map(|p| if nested { p + offset } else { p });

        let (target, pull, yields) = match cached {
            Some(anchor) => {
                let grown = self
                    .cache
                    .radius(path)
                    .is_some_and(|r| node.radius > r * GROWTH_TOLERANCE);
                if grown { (anchor, FRESH_PULL, true) } else { (anchor, ANCHOR_PULL, false) }
            }
            None if nested => (packed, FRESH_PULL, true),
            None => (Point::new(self.width / 2.0, self.height / 2.0), FRESH_PULL, true),
        };
        let start = cached.unwrap_or(packed);
        Body {
            x: start.x,
            y: start.y,
            vx: 0.0,
            vy: 0.0,
            radius: node.radius,
            collide_radius: node.radius + padding,
            target,
            pull,
            yields,
        }
    }

    /// Run the simulation; returns the number of ticks taken.
    fn simulate(&mut self, bodies: &mut [Body], depth: usize, frame: Option<&Frame>) -> usize {
        let decay = alpha_decay();
        let center = Point::new(self.width / 2.0, self.height / 2.0);
        let group_pull = depth <= GROUP_PULL_MAX_DEPTH;
        let mut grid = SpatialGrid::new(
            2.0 * bodies.iter().map(|b| b.collide_radius).fold(0.0, f64::max),
        );

        let mut alpha = 1.0;
        for tick in 0..self.cfg.iterations {
            alpha -= alpha * decay;

            // Group pulls move every body by the same amount.
            let c = centroid(bodies.iter().map(|b| Point::new(b.x, b.y)));
            let (mut sx, mut sy) = (0.0, 0.0);
            if group_pull {
                sx += (center.x - c.x) * GROUP_PULL_X * alpha;
                sy += (center.y - c.y) * GROUP_PULL_Y * alpha;
            }
            if let Some(f) = frame {
                let home = f.circle.center() + f.rest;
                sx += (home.x - c.x) * PARENT_PULL * alpha;
                sy += (home.y - c.y) * PARENT_PULL * alpha;
            }

            for body in bodies.iter_mut() {
                body.vx += sx + (body.target.x - body.x) * body.pull * alpha;
                body.vy += sy + (body.target.y - body.y) * body.pull * alpha;
            }

            for _ in 0..COLLIDE_PASSES {
                collide(bodies, &mut grid, &mut self.rng);
            }

            let mut max_step: f64 = 0.0;
            for body in bodies.iter_mut() {
                body.vx *= VELOCITY_RETAIN;
                body.vy *= VELOCITY_RETAIN;
                body.x += body.vx;
                body.y += body.vy;
                max_step = max_step.max(body.vx.hypot(body.vy));
                self.constrain(body, frame);
            }

            if self.cfg.settle_threshold.is_some_and(|t| max_step < t) {
                return tick + 1;
            }
        }
        self.cfg.iterations
    }

    /// Push apart siblings whose circles still overlap, re-constraining after
    /// every pass. Yielding bodies give way for the first half of the passes;
    /// after that every pair shares the correction. Returns the passes used.
    fn separate(&mut self, bodies: &mut [Body], frame: Option<&Frame>) -> usize {
        let mut grid =
            SpatialGrid::new(2.0 * bodies.iter().map(|b| b.radius).fold(0.0, f64::max));

        for pass in 0..SEPARATE_PASSES {
            let strict = pass < SEPARATE_PASSES / 2;
            grid.clear();
            for (i, body) in bodies.iter().enumerate() {
                grid.insert(i, Bounds::around(body.x, body.y, body.radius));
            }

            let mut displaced = false;
            for i in 0..bodies.len() {
                let (xi, yi, ri) = (bodies[i].x, bodies[i].y, bodies[i].radius);
                for j in grid.query(&Bounds::around(xi, yi, ri)) {
                    if j <= i {
                        continue;
                    }
                    let (head, tail) = bodies.split_at_mut(j);
                    let (a, b) = (&mut head[i], &mut tail[0]);

                    let reach = a.radius + b.radius;
                    let (mut dx, mut dy) = (a.x - b.x, a.y - b.y);
                    let mut distance = dx.hypot(dy);
                    if reach - distance <= OVERLAP_TOLERANCE {
                        continue;
                    }
                    if distance == 0.0 {
                        dx = self.rng.jiggle();
                        dy = self.rng.jiggle();
                        distance = dx.hypot(dy);
                    }
                    let overlap = reach - distance;
                    let (ux, uy) = (dx / distance, dy / distance);
                    let share = if strict {
                        share_of(a, b, a.radius, b.radius)
                    } else {
                        share_of_size(a.radius, b.radius)
                    };
                    a.x += ux * overlap * share;
                    a.y += uy * overlap * share;
                    b.x -= ux * overlap * (1.0 - share);
                    b.y -= uy * overlap * (1.0 - share);
                    displaced = true;
                }
            }

            for body in bodies.iter_mut() {
                self.constrain(body, frame);
            }
            if !displaced {
                return pass + 1;
            }
        }
        SEPARATE_PASSES
    }

    /// Keep a body on the canvas and, when nested, inside its parent.
    fn constrain(&self, body: &mut Body, frame: Option<&Frame>) {
        body.x = keep_between(body.radius, body.x, self.width - body.radius);
        body.y = keep_between(body.radius, body.y, self.height - body.radius);

        let Some(f) = frame else { return };
        let p = f.circle;
        let limit = (p.r - body.radius - f.margin).max(0.0);
        let (dx, dy) = (body.x - p.x, body.y - p.y);
        let distance = dx.hypot(dy);
        if distance > limit {
            let angle = dy.atan2(dx);
            body.x = p.x + angle.cos() * limit;
            body.y = p.y + angle.sin() * limit;
        }
    }
}

/// One collision pass: every overlapping pair is pushed apart. Yielding
/// bodies give way to unchanged ones; otherwise the smaller body takes the
/// larger share of the correction.
fn collide(bodies: &mut [Body], grid: &mut SpatialGrid, rng: &mut Lcg) {
    grid.clear();
    for (i, body) in bodies.iter().enumerate() {
        let (x, y) = body.predicted();
        grid.insert(i, Bounds::around(x, y, body.collide_radius));
    }

    for i in 0..bodies.len() {
        let (xi, yi) = bodies[i].predicted();
        let ri = bodies[i].collide_radius;
        for j in grid.query(&Bounds::around(xi, yi, ri)) {
            if j <= i {
                continue;
            }
            let (head, tail) = bodies.split_at_mut(j);
            let (a, b) = (&mut head[i], &mut tail[0]);

            let rj = b.collide_radius;
            let reach = ri + rj;
            let mut x = xi - b.x - b.vx;
            let mut y = yi - b.y - b.vy;
            let mut l = x * x + y * y;
            if l >= reach * reach {
                continue;
            }
            if x == 0.0 {
                x = rng.jiggle();
                l += x * x;
            }
            if y == 0.0 {
                y = rng.jiggle();
                l += y * y;
            }
            let distance = l.sqrt();
            let push = (reach - distance) / distance;
            x *= push;
            y *= push;

            let share = share_of(a, b, ri, rj);
            a.vx += x * share;
            a.vy += y * share;
            b.vx -= x * (1.0 - share);
            b.vy -= y * (1.0 - share);
        }
    }
}

/// Fraction of a pair's correction taken by `a`.
fn share_of(a: &Body, b: &Body, ra: f64, rb: f64) -> f64 {
    match (a.yields, b.yields) {
        (true, false) => 1.0,
        (false, true) => 0.0,
        _ => share_of_size(ra, rb),
    }
}

/// The smaller circle moves more.
fn share_of_size(ra: f64, rb: f64) -> f64 {
    rb * rb / (ra * ra + rb * rb)
}

/// Room between the group's outermost circle and the parent's rim.
fn slack(tree: &LaidOutTree, group: &[NodeIndex], parent: Circle) -> f64 {
    let reach = group
        .iter()
        .map(|&idx| {
            let node = tree.node(idx);
            node.center().distance(parent.center()) + node.radius
        })
        .fold(0.0, f64::max);
    parent.r - reach
}

fn centroid(points: impl Iterator<Item = Point>) -> Point {
    let (sum, count) = points.fold((Point::default(), 0usize), |(sum, n), p| (sum + p, n + 1));
    if count == 0 {
        return sum;
    }
    Point::new(sum.x / count as f64, sum.y / count as f64)
}

/// Collision padding for a depth: a square-root scale from the deepest level
/// (`collide_padding_min`) up to depth 1 (`collide_padding_max`), clamped.
fn collide_padding(depth: usize, max_depth: usize, cfg: &LayoutConfig) -> f64 {
    let lo = (max_depth.max(1) as f64).sqrt();
    let hi = 1.0;
    if lo == hi {
        return cfg.collide_padding_max;
    }
    let t = (((depth as f64).sqrt() - lo) / (hi - lo)).clamp(0.0, 1.0);
    cfg.collide_padding_min + (cfg.collide_padding_max - cfg.collide_padding_min) * t
}

/// Clamp that tolerates `min > max`, preferring `min`.
fn keep_between(min: f64, value: f64, max: f64) -> f64 {
    if value > max { max.max(min) } else { value.max(min) }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColorTheme;
    use crate::layout::pack;
    use crate::process::color::ColorScheme;
    use crate::process::process;
    use crate::tree::RawNode;
    use chrono::Utc;

    /// 1% of the default canvas width.
    const EPSILON: f64 = 14.0;

    fn make_files(dir: &str, sizes: &[u64]) -> Vec<RawNode> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| RawNode::file(&format!("{dir}/f{i}.rs"), size))
            .collect()
    }

    fn make_repo() -> RawNode {
        RawNode::dir(
            "",
            vec![
                RawNode::dir("src", make_files("src", &[4_000, 3_000, 2_500, 1_200, 800, 300])),
                RawNode::dir("docs", make_files("docs", &[1_500, 900, 200])),
                RawNode::dir("tests", make_files("tests", &[2_000, 2_000])),
                RawNode::file("README.md", 400),
            ],
        )
    }

    fn run(raw: &RawNode, previous: &PositionCache) -> LaidOutTree {
        let diagram = DiagramConfig::default();
        let cfg = LayoutConfig::default();
        let scheme = ColorScheme::new(ColorTheme::ByFileType, Utc::now());
        let processed = process(raw, &previous.sort_orders, &scheme);
        let packed = pack(processed, diagram.canvas_width, diagram.canvas_height, &cfg);
        stabilize(packed, previous, &diagram, &cfg)
    }

    #[test]
    fn test_containment_after_relaxation() {
        let tree = run(&make_repo(), &PositionCache::new());
        for node in &tree.nodes {
            let Some(parent) = node.parent else { continue };
            let p = tree.node(parent);
            let reach = node.center().distance(p.center()) + node.radius;
            assert!(reach <= p.radius + 1.0, "{} escapes {}", node.data.path, p.data.path);
        }
    }

    #[test]
    fn test_siblings_do_not_overlap_after_relaxation() {
        let tree = run(&make_repo(), &PositionCache::new());
        let (overlap, pair) = worst_overlap(&tree);
        assert!(overlap <= 1.0, "{pair} overlap by {overlap:.2}px");
    }

    #[test]
    fn test_top_level_stays_on_canvas() {
        let tree = run(&make_repo(), &PositionCache::new());
        for &idx in &tree.node(tree.root).children {
            let n = tree.node(idx);
            assert!(n.x - n.radius >= -1e-9 && n.x + n.radius <= 1400.0 + 1e-9);
            assert!(n.y - n.radius >= -1e-9 && n.y + n.radius <= 700.0 + 1e-9);
        }
    }

    #[test]
    fn test_cold_runs_are_identical() {
        let a = run(&make_repo(), &PositionCache::new());
        let b = run(&make_repo(), &PositionCache::new());
        assert_eq!(PositionCache::from_tree(&a), PositionCache::from_tree(&b));
    }

    fn make_body(x: f64, y: f64, radius: f64, yields: bool) -> Body {
        Body {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius,
            collide_radius: radius,
            target: Point::new(x, y),
            pull: if yields { FRESH_PULL } else { ANCHOR_PULL },
            yields,
        }
    }

    fn make_stabilizer<'a>(cache: &'a PositionCache, cfg: &'a LayoutConfig) -> Stabilizer<'a> {
        let diagram = DiagramConfig::default();
        Stabilizer {
            cache,
            cfg,
            width: diagram.canvas_width,
            height: diagram.canvas_height,
            max_depth: diagram.max_depth,
            rng: Lcg::new(1),
        }
    }

    /// Largest overlap between two siblings anywhere in the tree.
    fn worst_overlap(tree: &LaidOutTree) -> (f64, String) {
        let mut worst = (0.0, String::new());
        for node in &tree.nodes {
            for (i, &a) in node.children.iter().enumerate() {
                for &b in &node.children[i + 1..] {
                    let (a, b) = (tree.node(a), tree.node(b));
                    let overlap = a.radius + b.radius - a.center().distance(b.center());
                    if overlap > worst.0 {
                        worst = (overlap, format!("{} / {}", a.data.path, b.data.path));
                    }
                }
            }
        }
        worst
    }

    fn assert_subtree_in_place(tree: &LaidOutTree, cache: &PositionCache, path: &str) {
        let top = tree.find(path).unwrap();
        for idx in std::iter::once(top).chain(tree.descendants(top)) {
            let node = tree.node(idx);
            let before = cache.position(&node.data.path).unwrap();
            let moved = node.center().distance(before);
            assert!(moved < EPSILON, "{} moved {:.1}px", node.data.path, moved);
        }
    }

    fn push_top_level(raw: &mut RawNode, node: RawNode) {
        raw.children.get_or_insert_with(Vec::new).push(node);
    }

    #[test]
    fn test_warm_run_keeps_unchanged_subtree_in_place() {
        let first = run(&make_repo(), &PositionCache::new());
        let cache = PositionCache::from_tree(&first);

        let mut changed = make_repo();
        if let Some(tests_dir) = changed
            .children
            .as_mut()
            .and_then(|c| c.iter_mut().find(|n| n.path == "tests"))
        {
            tests_dir
                .children
                .get_or_insert_with(Vec::new)
                .push(RawNode::file("tests/f9.rs", 10));
        }
        let second = run(&changed, &cache);
        assert_subtree_in_place(&second, &cache, "docs");
    }

    #[test]
    fn test_warm_run_survives_new_loose_file() {
        let first = run(&make_repo(), &PositionCache::new());
        let cache = PositionCache::from_tree(&first);

        let mut changed = make_repo();
        push_top_level(&mut changed, RawNode::file("LICENSE", 900));
        let second = run(&changed, &cache);

        assert_subtree_in_place(&second, &cache, "docs");
        assert_subtree_in_place(&second, &cache, "tests");
        assert!(second.find("LICENSE").is_some());
        assert!(worst_overlap(&second).0 <= 1.0);
    }

    #[test]
    fn test_warm_run_survives_new_top_level_directory() {
        let first = run(&make_repo(), &PositionCache::new());
        let cache = PositionCache::from_tree(&first);

        let mut changed = make_repo();
        push_top_level(&mut changed, RawNode::dir("lib", make_files("lib", &[1_800, 1_100, 600])));
        let second = run(&changed, &cache);

        assert_subtree_in_place(&second, &cache, "docs");
        assert_subtree_in_place(&second, &cache, "tests");
        let (overlap, pair) = worst_overlap(&second);
        assert!(overlap <= 1.0, "{pair} overlap by {overlap:.2}px");
    }

    #[test]
    fn test_large_directory_keeps_siblings_apart() {
        for n in [30u64, 60, 120] {
            let sizes: Vec<u64> = (0..n).map(|i| 200 + (i * 733) % 4_000).collect();
            let raw = RawNode::dir(
                "",
                vec![
                    RawNode::dir("src", make_files("src", &sizes)),
                    RawNode::dir("docs", make_files("docs", &[1_500, 900, 200])),
                ],
            );

            let cold = run(&raw, &PositionCache::new());
            let (overlap, pair) = worst_overlap(&cold);
            assert!(overlap <= 1.0, "n={n}: {pair} overlap by {overlap:.2}px");

            let warm = run(&raw, &PositionCache::from_tree(&cold));
            let (overlap, pair) = worst_overlap(&warm);
            assert!(overlap <= 1.0, "n={n} warm: {pair} overlap by {overlap:.2}px");

            for node in &warm.nodes {
                let Some(parent) = node.parent else { continue };
                let p = warm.node(parent);
                let reach = node.center().distance(p.center()) + node.radius;
                assert!(reach <= p.radius + 1.0, "{} escapes {}", node.data.path, p.data.path);
            }
        }
    }

    #[test]
    fn test_body_seeding_follows_cache() {
        let tree = run(&make_repo(), &PositionCache::new());
        let docs = tree.node(tree.find("docs").unwrap());
        let cfg = LayoutConfig::default();

        let empty = PositionCache::new();
        let stabilizer = make_stabilizer(&empty, &cfg);
        let fresh = stabilizer.body(docs, Point::default(), false, 2.0);
        assert_eq!(fresh.target, Point::new(700.0, 350.0));
        assert_eq!(fresh.pull, FRESH_PULL);
        assert!(fresh.yields);
        assert_eq!(fresh.collide_radius, docs.radius + 2.0);

        // A new child of a nested group stays near where it was packed.
        let nested = stabilizer.body(docs, Point::default(), true, 2.0);
        assert_eq!(nested.target, docs.center());
        assert_eq!(nested.pull, FRESH_PULL);
        assert!(nested.yields);

        let mut cache = PositionCache::new();
        cache.positions.insert("docs".to_string(), Point::new(100.0, 100.0));
        cache.radii.insert("docs".to_string(), docs.radius);
        let stabilizer = make_stabilizer(&cache, &cfg);
        let anchored = stabilizer.body(docs, Point::new(10.0, 0.0), true, 2.0);
        assert_eq!(anchored.target, Point::new(110.0, 100.0));
        assert_eq!((anchored.x, anchored.y), (110.0, 100.0));
        assert_eq!(anchored.pull, ANCHOR_PULL);
        assert!(!anchored.yields);

        let mut shrunk = cache.clone();
        shrunk.radii.insert("docs".to_string(), docs.radius / 2.0);
        let stabilizer = make_stabilizer(&shrunk, &cfg);
        let grown = stabilizer.body(docs, Point::default(), false, 2.0);
        assert_eq!(grown.target, Point::new(100.0, 100.0));
        assert_eq!(grown.pull, FRESH_PULL);
        assert!(grown.yields);
    }

    #[test]
    fn test_separate_moves_yielding_body_only() {
        let cache = PositionCache::new();
        let cfg = LayoutConfig::default();
        let mut stabilizer = make_stabilizer(&cache, &cfg);
        let mut bodies = vec![
            make_body(400.0, 300.0, 20.0, false),
            make_body(430.0, 300.0, 20.0, true),
        ];
        let passes = stabilizer.separate(&mut bodies, None);
        assert!(passes < SEPARATE_PASSES);
        assert_eq!((bodies[0].x, bodies[0].y), (400.0, 300.0));
        assert!((bodies[1].x - 440.0).abs() < 1e-9);
        assert!((bodies[1].y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_separate_shares_inside_a_tight_parent() {
        let cache = PositionCache::new();
        let cfg = LayoutConfig::default();
        let mut stabilizer = make_stabilizer(&cache, &cfg);
        let frame = Frame {
            circle: Circle { x: 500.0, y: 300.0, r: 42.0 },
            margin: 1.0,
            rest: Point::default(),
        };
        let mut bodies = vec![
            make_body(495.0, 300.0, 20.0, false),
            make_body(505.0, 300.0, 20.0, true),
        ];
        stabilizer.separate(&mut bodies, Some(&frame));
        let (a, b) = (&bodies[0], &bodies[1]);
        let gap = Point::new(a.x, a.y).distance(Point::new(b.x, b.y));
        assert!(gap >= 40.0 - 1e-6);
        for b in &bodies {
            let reach = Point::new(b.x, b.y).distance(frame.circle.center()) + b.radius;
            assert!(reach <= 42.0 - 1.0 + 1e-6);
        }
    }

    #[test]
    fn test_cache_covers_every_node() {
        let tree = run(&make_repo(), &PositionCache::new());
        let cache = PositionCache::from_tree(&tree);
        assert_eq!(cache.len(), tree.len());
        assert_eq!(cache.sort_orders.len(), tree.len());
        assert_eq!(cache.radii.len(), tree.len());
        let docs = tree.node(tree.find("docs").unwrap());
        assert_eq!(cache.radius("docs"), Some(docs.radius));
        assert!(cache.position("src/f0.rs").is_some());
        assert!(cache.position("").is_some());
    }

    #[test]
    fn test_early_exit_stops_before_full_run() {
        let cache = PositionCache::new();
        let cfg = LayoutConfig { settle_threshold: Some(0.5), ..LayoutConfig::default() };
        let mut stabilizer = make_stabilizer(&cache, &cfg);
        let mut bodies = vec![Body {
            x: 700.0,
            y: 350.0,
            vx: 0.0,
            vy: 0.0,
            radius: 10.0,
            collide_radius: 13.0,
            target: Point::new(700.0, 350.0),
            pull: ANCHOR_PULL,
            yields: false,
        }];
        let ticks = stabilizer.simulate(&mut bodies, 1, None);
        assert!(ticks < cfg.iterations);
    }

    #[test]
    fn test_projection_into_parent() {
        let cache = PositionCache::new();
        let cfg = LayoutConfig::default();
        let stabilizer = make_stabilizer(&cache, &cfg);
        let frame = Frame {
            circle: Circle { x: 500.0, y: 300.0, r: 50.0 },
            margin: 3.0,
            rest: Point::default(),
        };
        let mut body = make_body(600.0, 300.0, 10.0, true);
        stabilizer.constrain(&mut body, Some(&frame));
        assert!((body.x - 537.0).abs() < 1e-9);
        assert!((body.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_collide_separates_coincident_bodies() {
        let mut bodies = vec![make_body(0.0, 0.0, 5.0, true), make_body(0.0, 0.0, 5.0, true)];
        let mut grid = SpatialGrid::new(10.0);
        collide(&mut bodies, &mut grid, &mut Lcg::new(1));
        assert!(bodies[0].vx != bodies[1].vx || bodies[0].vy != bodies[1].vy);
    }

    #[test]
    fn test_collide_padding_scale() {
        let cfg = LayoutConfig::default();
        assert_eq!(collide_padding(1, 9, &cfg), 8.0);
        assert_eq!(collide_padding(9, 9, &cfg), 3.0);
        assert_eq!(collide_padding(20, 9, &cfg), 3.0);
        let mid = collide_padding(4, 9, &cfg);
        assert!((mid - 5.5).abs() < 1e-9);
        assert_eq!(collide_padding(3, 1, &cfg), 8.0);
    }

    #[test]
    fn test_keep_between_tolerates_inverted_range() {
        assert_eq!(keep_between(10.0, 5.0, 20.0), 10.0);
        assert_eq!(keep_between(10.0, 25.0, 20.0), 20.0);
        assert_eq!(keep_between(10.0, 15.0, 20.0), 15.0);
        assert_eq!(keep_between(30.0, 25.0, 20.0), 30.0);
    }
}
