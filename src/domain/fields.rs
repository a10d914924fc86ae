//! Per-tool response field allowlists
//!
//! Loaded from a JSON file of the form
//! `{"supported_fields": {"<tool name>": ["keyword", "items.title"]}}`. Paths are
//! dot-separated and arrays are filtered element by element, so `items.title`
//! keeps the `title` of every entry in `items`. Tools without an entry return the
//! upstream result untouched.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldConfigError {
    #[error("failed to read field configuration `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid field configuration: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("field configuration for `{0}` contains an empty path")]
    EmptyPath(String),
}

#[derive(Debug, Deserialize)]
struct FieldConfigFile {
    supported_fields: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FieldTree {
    keep_all: bool,
    children: BTreeMap<String, FieldTree>,
}

impl FieldTree {
    fn insert(&mut self, path: &str) {
        let node = path
            .split('.')
            .fold(self, |node, segment| node.children.entry(segment.to_string()).or_default());
        node.keep_all = true;
    }

    fn project(&self, value: Value) -> Value {
        if self.keep_all {
            return value;
        }

        match value {
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.project(item)).collect())
            }
            Value::Object(mut object) => {
                let kept: Map<String, Value> = self
                    .children
                    .iter()
                    .filter_map(|(key, child)| {
                        object
                            .remove(key)
                            .map(|value| (key.clone(), child.project(value)))
                    })
                    .collect();
                Value::Object(kept)
            }
            scalar => scalar,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
    tools: HashMap<String, FieldTree>,
}

impl FieldFilter {
    pub fn load(path: &Path) -> Result<Self, FieldConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| FieldConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, FieldConfigError> {
        let file: FieldConfigFile = serde_json::from_str(raw)?;

        let mut tools = HashMap::with_capacity(file.supported_fields.len());
        for (tool, paths) in file.supported_fields {
            let mut tree = FieldTree::default();
            for path in paths {
                let path = path.trim();
                if path.is_empty() || path.split('.').any(str::is_empty) {
                    return Err(FieldConfigError::EmptyPath(tool));
                }
                tree.insert(path);
            }
            tools.insert(tool, tree);
        }

        Ok(Self { tools })
    }

    /// Names of the tools with an allowlist.
    pub fn tools(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn apply(&self, tool: &str, result: Value) -> Value {
        match self.tools.get(tool) {
            Some(tree) => tree.project(result),
            None => result,
        }
    }
}
