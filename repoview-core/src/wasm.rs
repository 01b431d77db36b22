//! WASM bindings for the repoview-core library.
//!
//! All functions exposed to JavaScript via wasm-bindgen are defined here.
//! Every entry point returns a JSON `DiagramOutput`; failures land in its
//! `error` field instead of being thrown.

use std::str::FromStr;

use log::{Level, info};
use wasm_bindgen::prelude::*;

use crate::config::DiagramConfig;
use crate::error::DiagramError;
use crate::layout::stabilize::PositionCache;
use crate::output::DiagramOutput;
use crate::tree::parse_tree;
use crate::compute_diagram;

const SERIALIZE_FAILURE: &str = r#"{"error":{"message":"failed to serialize diagram"}}"#;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = error)]
    pub fn console_error(s: &str);
}

/// Route `log` output to the browser console. `level` is a `log` level name
/// (`"debug"`, `"warn"`, ...); anything unrecognized means info.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::Info);
    let _ = console_log::init_with_level(level);
    console_error_panic_hook::set_once();
    info!("Logging initialized at {level}");
}

/// Holds the position cache between layouts of the same page.
#[wasm_bindgen]
#[derive(Debug, Default)]
pub struct DiagramSession {
    cache: PositionCache,
}

#[wasm_bindgen]
impl DiagramSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out a tree, relaxing toward the previous layout of this session.
    /// The cache only advances when the layout succeeds.
    pub fn compute(&mut self, tree_json: &str, config_json: &str) -> String {
        match run(tree_json, config_json, &self.cache) {
            Ok((output, cache)) => {
                self.cache = cache;
                to_json(&output)
            }
            Err(e) => report(e),
        }
    }

    /// Forget the previous layout; the next `compute` starts cold.
    pub fn reset(&mut self) {
        self.cache = PositionCache::new();
    }

    #[wasm_bindgen(getter, js_name = cachedNodes)]
    pub fn cached_nodes(&self) -> usize {
        self.cache.len()
    }
}

/// One-shot layout with no previous state.
#[wasm_bindgen(js_name = computeDiagram)]
pub fn compute_diagram_json(tree_json: &str, config_json: &str) -> String {
    match run(tree_json, config_json, &PositionCache::new()) {
        Ok((output, _)) => to_json(&output),
        Err(e) => report(e),
    }
}

fn run(
    tree_json: &str,
    config_json: &str,
    previous: &PositionCache,
) -> Result<(DiagramOutput, PositionCache), DiagramError> {
    let raw = parse_tree(tree_json)?;
    let config = DiagramConfig::from_json(config_json)?;
    Ok(compute_diagram(&raw, &config, previous))
}

fn report(e: DiagramError) -> String {
    console_error(&format!("Error computing diagram: {e}"));
    to_json(&DiagramOutput::from_error(e.to_string()))
}

fn to_json(output: &DiagramOutput) -> String {
    serde_json::to_string(output).unwrap_or_else(|_| SERIALIZE_FAILURE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = r#"{
        "name": "", "path": "",
        "children": [
            {"name": "src", "path": "src", "children": [
                {"name": "main.rs", "path": "src/main.rs", "size": 1200,
                 "imports": [{"moduleName": "src/lib"}]},
                {"name": "lib.rs", "path": "src/lib.rs", "size": 3000}
            ]},
            {"name": "Cargo.toml", "path": "Cargo.toml", "size": 300}
        ]
    }"#;

    #[test]
    fn test_run_produces_nodes_and_cache() {
        let (output, cache) =
            run(TREE, r#"{"focusPath": "src/lib.rs"}"#, &PositionCache::new()).unwrap();
        assert_eq!(output.nodes.len(), 5);
        assert_eq!(output.edges.len(), 1);
        assert!(output.error.is_none());
        assert_eq!(cache.len(), 6);
    }

    #[test]
    fn test_run_reports_bad_input() {
        assert!(matches!(
            run("not json", "", &PositionCache::new()),
            Err(DiagramError::InvalidTree(_))
        ));
        assert!(matches!(
            run(TREE, r#"{"maxDepth": "deep"}"#, &PositionCache::new()),
            Err(DiagramError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_session_advances_and_resets_cache() {
        let mut session = DiagramSession::new();
        assert_eq!(session.cached_nodes(), 0);

        let json = session.compute(TREE, "");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["nodes"].is_array());
        assert!(value.get("error").is_none());
        assert_eq!(session.cached_nodes(), 6);

        session.reset();
        assert_eq!(session.cached_nodes(), 0);
    }

    #[test]
    fn test_error_output_shape() {
        let json = to_json(&DiagramOutput::from_error("boom"));
        assert_eq!(json, r#"{"error":{"message":"boom"}}"#);
    }
}
