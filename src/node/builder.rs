// clusterconfig-core/src/node/builder.rs

use super::definition::{ArrayNode, ObjectNode, SettingsNode, ValueNode};
use super::merge::{merge_optional, MergeOptions};
use crate::common::SharedStr;

/// Splits a settings path on `/` or `\`, dropping empty segments.
///
/// `"foo//bar/"` and `"\\foo\\bar"` both yield `["foo", "bar"]`; the empty
/// path yields no segments and addresses the root.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect()
}

impl SettingsNode {
    /// Wraps `leaf` in nested Objects named by `segments`.
    ///
    /// The leaf takes the last segment as its name; the outermost Object is
    /// unnamed. With no segments the leaf is returned unnamed.
    pub fn from_path<I, S>(segments: I, leaf: SettingsNode) -> SettingsNode
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: DoubleEndedIterator,
        S: AsRef<str>,
    {
        let mut segments = segments.into_iter().rev();
        let Some(last) = segments.next() else {
            return leaf.with_name(None);
        };
        let mut node = leaf.with_name(Some(SharedStr::from(last.as_ref())));
        for segment in segments {
            node = SettingsNode::Object(ObjectNode::new(Some(SharedStr::from(segment.as_ref())), vec![node]));
        }
        SettingsNode::Object(ObjectNode::new(None, vec![node]))
    }
}

/// Accumulates a tree from path/value pairs, merging each addition deeply.
#[derive(Debug, Default, Clone)]
pub struct TreeBuilder {
    tree: Option<SettingsNode>,
    options: MergeOptions,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: MergeOptions) -> Self {
        Self { tree: None, options }
    }

    /// Adds a Value leaf at `path`.
    pub fn add(self, path: &str, value: &str) -> Self {
        let leaf = SettingsNode::Value(ValueNode::new(None, Some(SharedStr::from(value))));
        self.add_node(path, leaf)
    }

    /// Adds an Array of Value leaves at `path`.
    pub fn add_array<I, V>(self, path: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SharedStr>,
    {
        let children = values
            .into_iter()
            .map(|v| SettingsNode::Value(ValueNode::new(None, Some(v.into()))))
            .collect();
        self.add_node(path, SettingsNode::Array(ArrayNode::new(None, children)))
    }

    pub fn add_node(mut self, path: &str, leaf: SettingsNode) -> Self {
        let addition = SettingsNode::from_path(split_path(path), leaf);
        self.tree = merge_optional(self.tree.take(), Some(addition), &self.options);
        self
    }

    pub fn build(self) -> Option<SettingsNode> {
        self.tree
    }
}
