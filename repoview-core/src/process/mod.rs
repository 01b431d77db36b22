// Tree processing: RawNode -> ProcessedNode.
//
// Children are processed before their parent so a directory can derive its
// color and value from what it contains. Two structural rewrites happen here:
// - a non-root directory with exactly one child is replaced by that child,
//   renamed `dir/child` (applied bottom-up, so whole chains collapse)
// - at the root, leaf children are moved into one synthetic loose-files node

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::tree::{Commit, Import, RawNode};

pub mod color;
pub mod value;

use color::{ColorInputs, ColorScheme};
use value::{MIN_PACKING_VALUE, SortOrderPolicy, file_value};

/// Reserved id (and path) of the synthetic node grouping loose top-level files.
pub const LOOSE_FILES_ID: &str = "__structure_loose_file__";

/// Labels longer than this are cut and suffixed with `...`.
pub const MAX_LABEL_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedNode {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub commits: Vec<Commit>,
    pub imports: Vec<Import>,
    /// Lowercased extension of the name, empty if there is none.
    pub extension: String,
    pub path_without_extension: String,
    pub label: String,
    pub color: String,
    /// Packing weight, always > 0. Directories sum their children.
    pub value: f64,
    pub sort_order: f64,
    /// The extension a directory is colored after; a file's own extension.
    pub dominant_extension: String,
    /// Commits in the subtree.
    pub commit_count: usize,
    /// Most recent commit in the subtree.
    pub last_commit: Option<DateTime<Utc>>,
    pub is_loose: bool,
    pub children: Option<Vec<ProcessedNode>>,
}

impl ProcessedNode {
    pub fn is_leaf(&self) -> bool {
        self.children.as_ref().is_none_or(|c| c.is_empty())
    }

    pub fn child_count(&self) -> usize {
        self.children.as_ref().map_or(0, Vec::len)
    }

    /// Depth-first search by path.
    pub fn find(&self, path: &str) -> Option<&ProcessedNode> {
        if self.path == path {
            return Some(self);
        }
        self.children
            .iter()
            .flatten()
            .find_map(|child| child.find(path))
    }
}

/// Annotate and restructure a raw tree.
///
/// `previous_orders` is the sort-order half of the previous layout's cache;
/// pass an empty map on the first run.
pub fn process(
    raw: &RawNode,
    previous_orders: &HashMap<String, f64>,
    scheme: &ColorScheme,
) -> ProcessedNode {
    let processor = TreeProcessor {
        orders: SortOrderPolicy::new(previous_orders),
        scheme,
    };
    processor.process_node(raw, 0, true)
}

struct TreeProcessor<'a> {
    orders: SortOrderPolicy<'a>,
    scheme: &'a ColorScheme,
}

impl TreeProcessor<'_> {
    fn process_node(&self, raw: &RawNode, index: usize, is_root: bool) -> ProcessedNode {
        let mut children = raw.children.as_ref().map(|kids| {
            kids.iter()
                .enumerate()
                .map(|(i, child)| self.process_node(child, i, false))
                .collect::<Vec<_>>()
        });

        if !is_root {
            if let Some(kids) = children.as_mut() {
                if kids.len() == 1 {
                    if let Some(only) = kids.pop() {
                        return collapse_into(&raw.name, only);
                    }
                }
            }
        }

        if is_root {
            children = children.map(|kids| self.group_loose_files(kids));
        }

        self.build_node(raw, index, children)
    }

    fn build_node(
        &self,
        raw: &RawNode,
        index: usize,
        children: Option<Vec<ProcessedNode>>,
    ) -> ProcessedNode {
        let extension = extension_of(&raw.name);
        let kids = children.as_deref().unwrap_or_default();

        let value = if kids.is_empty() {
            file_value(&extension, raw.size, index)
        } else {
            kids.iter().map(|c| c.value).sum::<f64>().max(MIN_PACKING_VALUE)
        };

        let dominant_extension = if kids.is_empty() {
            extension.clone()
        } else {
            dominant_extension(kids)
        };

        let commit_count = raw.commits.len() + kids.iter().map(|c| c.commit_count).sum::<usize>();
        let last_commit = raw
            .commits
            .iter()
            .filter_map(Commit::timestamp)
            .chain(kids.iter().filter_map(|c| c.last_commit))
            .max();

        let color = self.scheme.color(ColorInputs {
            dominant_extension: &dominant_extension,
            commit_count,
            last_commit,
        });
        let sort_order = self
            .orders
            .order(&raw.path, &raw.name, raw.children.is_some(), value, index);

        ProcessedNode {
            name: raw.name.clone(),
            path: raw.path.clone(),
            size: raw.size,
            commits: raw.commits.clone(),
            imports: raw.imports.clone(),
            path_without_extension: strip_extension(&raw.path, &extension),
            label: truncate_label(&raw.name),
            extension,
            color,
            value,
            sort_order,
            dominant_extension,
            commit_count,
            last_commit,
            is_loose: false,
            children,
        }
    }

    /// Move leaf children of the root into a single synthetic node.
    fn group_loose_files(&self, children: Vec<ProcessedNode>) -> Vec<ProcessedNode> {
        let (loose, mut grouped): (Vec<_>, Vec<_>) =
            children.into_iter().partition(ProcessedNode::is_leaf);
        if loose.is_empty() {
            return grouped;
        }

        let holder = RawNode {
            name: LOOSE_FILES_ID.to_string(),
            path: LOOSE_FILES_ID.to_string(),
            children: Some(Vec::new()),
            ..RawNode::default()
        };
        let mut node = self.build_node(&holder, grouped.len(), Some(loose));
        node.is_loose = true;
        node.label = String::new();
        grouped.push(node);
        grouped
    }
}

fn collapse_into(parent_name: &str, mut only: ProcessedNode) -> ProcessedNode {
    only.name = format!("{parent_name}/{}", only.name);
    only.label = truncate_label(&only.name);
    only
}

/// Most frequent dominant extension among immediate children; ties go to the first seen.
fn dominant_extension(children: &[ProcessedNode]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for child in children {
        let key = child.dominant_extension.as_str();
        match counts.iter_mut().find(|(seen, _)| *seen == key) {
            Some(entry) => entry.1 += 1,
            None => counts.push((key, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (key, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key.to_string()).unwrap_or_default()
}

pub fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

fn strip_extension(path: &str, extension: &str) -> String {
    if extension.is_empty() {
        return path.to_string();
    }
    match path.rsplit_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => path.to_string(),
    }
}

pub fn truncate_label(name: &str) -> String {
    if name.chars().count() < MAX_LABEL_CHARS {
        return name.to_string();
    }
    let cut: String = name.chars().take(MAX_LABEL_CHARS - 2).collect();
    format!("{cut}...")
}
