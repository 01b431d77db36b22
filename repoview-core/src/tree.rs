// Raw repository tree, as produced by an external tree builder.
//
// Decoding is lenient: a malformed node only drops itself and its subtree,
// the rest of the tree survives. Only a malformed root (or broken JSON)
// fails the whole decode.

use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DiagramError;

/// A single commit touching a file. Dates are kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub date: String,
}

impl Commit {
    /// Parse the commit date. Accepts RFC 3339 or a bare `YYYY-MM-DD`.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&self.date) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .ok()
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

/// An import statement found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Import {
    pub module_name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawNode {
    pub name: String,
    /// Unique within the tree. The root has an empty path.
    pub path: String,
    /// Bytes. Only meaningful for files.
    pub size: u64,
    /// `None` for files, `Some` for directories (possibly empty).
    pub children: Option<Vec<RawNode>>,
    /// Most recent first.
    pub commits: Vec<Commit>,
    pub imports: Vec<Import>,
}

impl RawNode {
    /// A file node. The name is the last path segment.
    pub fn file(path: &str, size: u64) -> Self {
        Self {
            name: last_segment(path).to_string(),
            path: path.to_string(),
            size,
            ..Self::default()
        }
    }

    /// A directory node. An empty path makes it a root.
    pub fn dir(path: &str, children: Vec<RawNode>) -> Self {
        Self {
            name: last_segment(path).to_string(),
            path: path.to_string(),
            children: Some(children),
            ..Self::default()
        }
    }

    pub fn with_imports(mut self, modules: &[&str]) -> Self {
        self.imports = modules
            .iter()
            .map(|m| Import { module_name: m.to_string() })
            .collect();
        self
    }

    pub fn with_commits(mut self, dates: &[&str]) -> Self {
        self.commits = dates
            .iter()
            .map(|d| Commit { date: d.to_string() })
            .collect();
        self
    }

    /// Files and empty directories.
    pub fn is_leaf(&self) -> bool {
        self.children.as_ref().is_none_or(|c| c.is_empty())
    }

    /// Decode a root node from an already-parsed JSON value.
    pub fn from_value(value: &Value) -> Result<Self, DiagramError> {
        decode_node(value, true)
    }
}

/// Parse a JSON tree description.
pub fn parse_tree(input: &str) -> Result<RawNode, DiagramError> {
    let value: Value = serde_json::from_str(input).map_err(DiagramError::InvalidTree)?;
    RawNode::from_value(&value)
}

fn decode_node(value: &Value, is_root: bool) -> Result<RawNode, DiagramError> {
    let object = value.as_object().ok_or(DiagramError::NotAnObject)?;

    let path = match object.get("path") {
        Some(Value::String(path)) => path.clone(),
        None | Some(Value::Null) if is_root => String::new(),
        _ => {
            return Err(DiagramError::MissingField {
                field: "path",
                path: String::from("<unknown>"),
            });
        }
    };

    let name = match object.get("name") {
        Some(Value::String(name)) => name.clone(),
        None | Some(Value::Null) if is_root => String::new(),
        _ => {
            return Err(DiagramError::MissingField { field: "name", path });
        }
    };

    let size = match object.get("size") {
        None | Some(Value::Null) => 0,
        Some(Value::Number(number)) => {
            if let Some(bytes) = number.as_u64() {
                bytes
            } else if let Some(bytes) = number.as_f64() {
                // Negative sizes are clamped later to the minimum packing weight.
                if bytes.is_finite() { bytes.max(0.0) as u64 } else { 0 }
            } else {
                return Err(DiagramError::InvalidSize { path });
            }
        }
        Some(_) => return Err(DiagramError::InvalidSize { path }),
    };

    let children = match object.get("children") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|item| match decode_node(item, false) {
                    Ok(child) => Some(child),
                    Err(error) => {
                        warn!("skipping malformed node under {path:?}: {error}");
                        None
                    }
                })
                .collect(),
        ),
        Some(_) => {
            return Err(DiagramError::InvalidField { field: "children", path });
        }
    };

    let commits = decode_list(object.get("commits"), "commits", &path)?;
    let imports = decode_list(object.get("imports"), "imports", &path)?;

    Ok(RawNode {
        name,
        path,
        size,
        children,
        commits,
        imports,
    })
}

/// Decode an optional list, dropping entries that don't match the expected shape.
fn decode_list<'de, T: Deserialize<'de>>(
    value: Option<&'de Value>,
    field: &'static str,
    path: &str,
) -> Result<Vec<T>, DiagramError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items
            .iter()
            .filter_map(|item| T::deserialize(item).ok())
            .collect()),
        Some(_) => Err(DiagramError::InvalidField {
            field,
            path: path.to_string(),
        }),
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_tree() {
        let input = r#"{
            "name": "", "path": "", "size": 0,
            "children": [
                {"name": "src", "path": "src", "size": 0, "children": [
                    {"name": "main.rs", "path": "src/main.rs", "size": 1200,
                     "commits": [{"date": "2024-03-01T10:00:00Z"}],
                     "imports": [{"moduleName": "src/lib"}]}
                ]},
                {"name": "README.md", "path": "README.md", "size": 40}
            ]
        }"#;

        let root = parse_tree(input).unwrap();
        let children = root.children.as_ref().unwrap();
        assert_eq!(children.len(), 2);

        let main = &children[0].children.as_ref().unwrap()[0];
        assert_eq!(main.path, "src/main.rs");
        assert_eq!(main.size, 1200);
        assert_eq!(main.commits.len(), 1);
        assert_eq!(main.imports[0].module_name, "src/lib");
        assert!(main.is_leaf());
        assert!(!children[0].is_leaf());
    }

    #[test]
    fn test_malformed_child_skips_only_its_subtree() {
        let input = r#"{
            "name": "", "path": "",
            "children": [
                {"name": "broken",
                 "children": [{"name": "a.rs", "path": "broken/a.rs", "size": 1}]},
                {"name": "bad-size.rs", "path": "bad-size.rs", "size": "huge"},
                {"name": "ok.rs", "path": "ok.rs", "size": 10}
            ]
        }"#;

        let root = parse_tree(input).unwrap();
        let children = root.children.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].path, "ok.rs");
    }

    #[test]
    fn test_malformed_root_is_an_error() {
        assert!(matches!(parse_tree("[1, 2]"), Err(DiagramError::NotAnObject)));
        assert!(matches!(parse_tree("{"), Err(DiagramError::InvalidTree(_))));
        assert!(matches!(
            parse_tree(r#"{"path": "", "size": "x"}"#),
            Err(DiagramError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_negative_and_float_sizes() {
        let root = parse_tree(
            r#"{"path": "", "children": [
                {"name": "a", "path": "a", "size": -20},
                {"name": "b", "path": "b", "size": 12.7}
            ]}"#,
        )
        .unwrap();
        let children = root.children.unwrap();
        assert_eq!(children[0].size, 0);
        assert_eq!(children[1].size, 12);
    }

    #[test]
    fn test_commit_timestamp_formats() {
        let rfc = Commit { date: "2024-05-01T12:30:00+02:00".into() };
        assert_eq!(rfc.timestamp().unwrap().to_rfc3339(), "2024-05-01T10:30:00+00:00");

        let day = Commit { date: "2024-05-01".into() };
        assert!(day.timestamp().is_some());

        let junk = Commit { date: "last tuesday".into() };
        assert!(junk.timestamp().is_none());
    }

    #[test]
    fn test_builders_use_last_segment_as_name() {
        let file = RawNode::file("src/app/main.rs", 5);
        assert_eq!(file.name, "main.rs");
        let root = RawNode::dir("", vec![file]);
        assert_eq!(root.name, "");
        assert!(!root.is_leaf());
    }
}
