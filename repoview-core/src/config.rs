//! User-facing diagram configuration.
//!
//! Deserialized from camelCase JSON; every field is optional.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DiagramError;

pub const DEFAULT_CANVAS_WIDTH: f64 = 1400.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 700.0;
pub const DEFAULT_MAX_DEPTH: usize = 9;

/// How nodes are colored. Exactly one theme is active per diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorTheme {
    #[default]
    ByFileType,
    ByChangeFrequency,
    ByRecency,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagramConfig {
    pub color_theme: ColorTheme,
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Deepest level exposed to the renderer. The root is depth 0 and never rendered.
    pub max_depth: usize,
    /// When non-empty, unlisted nodes are de-emphasized and the legend is dropped.
    pub highlighted_paths: Vec<String>,
    /// Only edges touching this path (or anything under it) are emitted.
    pub focus_path: Option<String>,
    /// End of the recency window. Defaults to the current time.
    pub now: Option<DateTime<Utc>>,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            color_theme: ColorTheme::default(),
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            max_depth: DEFAULT_MAX_DEPTH,
            highlighted_paths: Vec::new(),
            focus_path: None,
            now: None,
        }
    }
}

impl DiagramConfig {
    /// Parse a JSON config. Blank input yields the defaults.
    pub fn from_json(input: &str) -> Result<Self, DiagramError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(input).map_err(DiagramError::InvalidConfig)
    }

    /// Replace out-of-range values with usable ones.
    pub fn sanitized(mut self) -> Self {
        if !(self.canvas_width.is_finite() && self.canvas_width > 0.0) {
            self.canvas_width = DEFAULT_CANVAS_WIDTH;
        }
        if !(self.canvas_height.is_finite() && self.canvas_height > 0.0) {
            self.canvas_height = DEFAULT_CANVAS_HEIGHT;
        }
        self.max_depth = self.max_depth.max(1);
        self
    }

    /// The focused path, treating an empty string as no focus.
    pub fn focus(&self) -> Option<&str> {
        self.focus_path.as_deref().filter(|p| !p.is_empty())
    }

    pub fn is_highlighted(&self, path: &str) -> bool {
        self.highlighted_paths.iter().any(|p| p == path)
    }
}

/// `path` equals `prefix` or lies underneath it.
pub fn is_within(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
