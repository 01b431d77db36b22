// Packing weights and stable sort keys.

use std::collections::HashMap;

use super::color::is_known_extension;

/// Smallest weight any node may pack with.
pub const MIN_PACKING_VALUE: f64 = 1.0;

/// Weight cap for files with a recognized extension.
pub const MAX_FILE_VALUE: f64 = 15_000.0;
/// Tighter cap for files whose extension isn't recognized.
pub const MAX_UNKNOWN_FILE_VALUE: f64 = 9_000.0;
/// Flat weight for images and fonts, whatever their size.
pub const ASSET_VALUE: f64 = 100.0;

/// Added per sibling index so equal sizes never tie.
pub const SIBLING_VALUE_STEP: f64 = 1e-3;
/// Subtracted per sibling index when deriving a sort key from the value.
pub const SIBLING_ORDER_STEP: f64 = 1.0;

/// Sort key for a node appearing inside an already-ordered group.
pub const NEW_SIBLING_ORDER: f64 = -1.0e12;
/// Sort key for `public` directories.
pub const PUBLIC_DIR_ORDER: f64 = 1.0e12;

const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "bmp", "woff", "woff2", "ttf", "otf",
    "eot",
];

pub fn is_asset_extension(extension: &str) -> bool {
    ASSET_EXTENSIONS.contains(&extension)
}

/// Packing weight of a file.
pub fn file_value(extension: &str, size: u64, index: usize) -> f64 {
    let base = if is_asset_extension(extension) {
        ASSET_VALUE
    } else {
        let cap = if is_known_extension(extension) {
            MAX_FILE_VALUE
        } else {
            MAX_UNKNOWN_FILE_VALUE
        };
        (size as f64).min(cap)
    };
    base.max(MIN_PACKING_VALUE) + index as f64 * SIBLING_VALUE_STEP
}

/// Resolves `sortOrder` for a node, highest priority first:
/// a cached order, then the new-sibling sentinel, then `public`, then the value.
pub struct SortOrderPolicy<'a> {
    previous: &'a HashMap<String, f64>,
}

impl<'a> SortOrderPolicy<'a> {
    pub fn new(previous: &'a HashMap<String, f64>) -> Self {
        Self { previous }
    }

    pub fn order(
        &self,
        path: &str,
        name: &str,
        is_directory: bool,
        value: f64,
        index: usize,
    ) -> f64 {
        if let Some(&cached) = self.previous.get(path) {
            return cached;
        }
        if !path.is_empty() && self.previous.contains_key(parent_path(path)) {
            return NEW_SIBLING_ORDER;
        }
        if is_directory && name == "public" {
            return PUBLIC_DIR_ORDER;
        }
        value - index as f64 * SIBLING_ORDER_STEP
    }
}

/// Everything before the last `/`, or `""` for top-level paths.
pub fn parent_path(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}
