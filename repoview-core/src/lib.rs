//! Stable circle-packing layout for repository diagrams.
//!
//! Pipeline: raw tree -> [`process`] -> [`layout::pack`] ->
//! [`layout::stabilize::stabilize`] -> rendered nodes + [`edges`].
//!
//! The only state carried between calls is the [`PositionCache`]: pass the
//! cache returned by one call into the next to keep unchanged parts of the
//! diagram where they were.

pub mod config;
pub mod edges;
pub mod error;
pub mod layout;
pub mod output;
pub mod process;
pub mod tree;
mod wasm;

use chrono::Utc;
use log::debug;

pub use config::{ColorTheme, DiagramConfig};
pub use error::DiagramError;
pub use layout::LayoutConfig;
pub use layout::stabilize::PositionCache;
pub use output::{DiagramOutput, EdgeOutput, NodeOutput};
pub use tree::{RawNode, parse_tree};

use edges::resolve_edges;
use layout::pack;
use layout::stabilize::stabilize;
use output::node_outputs;
use process::color::ColorScheme;

/// Lay out `raw` with the default tuning.
pub fn compute_diagram(
    raw: &RawNode,
    config: &DiagramConfig,
    previous: &PositionCache,
) -> (DiagramOutput, PositionCache) {
    compute_diagram_with(raw, config, &LayoutConfig::default(), previous)
}

/// Lay out `raw`, relaxing toward `previous`. Returns the diagram and the
/// cache to pass to the next call.
pub fn compute_diagram_with(
    raw: &RawNode,
    config: &DiagramConfig,
    layout_cfg: &LayoutConfig,
    previous: &PositionCache,
) -> (DiagramOutput, PositionCache) {
    let config = config.clone().sanitized();
    let scheme = ColorScheme::new(config.color_theme, config.now.unwrap_or_else(Utc::now));

    let processed = process::process(raw, &previous.sort_orders, &scheme);
    let packed = pack(processed, config.canvas_width, config.canvas_height, layout_cfg);
    let settled = stabilize(packed, previous, &config, layout_cfg);
    let cache = PositionCache::from_tree(&settled);

    let rendered = settled.rendered(config.max_depth);
    let nodes = node_outputs(&settled, &rendered, &config);
    let edges: Vec<EdgeOutput> = resolve_edges(
        &settled,
        &rendered,
        config.focus(),
        config.max_depth,
        layout_cfg.edge_min_gap,
    )
    .into_iter()
    .map(EdgeOutput::from)
    .collect();

    let legend = config.highlighted_paths.is_empty().then(|| {
        scheme.legend(
            rendered
                .iter()
                .map(|&idx| settled.node(idx))
                .filter(|n| n.is_leaf())
                .map(|n| n.data.extension.as_str()),
        )
    });

    debug!(
        "diagram: {} nodes ({} rendered), {} edges, {} cached paths",
        settled.len(),
        nodes.len(),
        edges.len(),
        cache.len()
    );

    let output = DiagramOutput {
        nodes,
        edges,
        legend,
        error: None,
    };
    (output, cache)
}
