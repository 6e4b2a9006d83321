// clusterconfig-core/src/node/merge.rs

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::definition::{ArrayNode, ObjectNode, SettingsNode};
use crate::common::compare_optional_names;

/// How two Object nodes combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectMergeStyle {
    /// Union of keys; children present on both sides are merged recursively.
    #[default]
    Deep,
    /// Union of keys; children present on both sides are taken from the right.
    Shallow,
}

/// How two Array nodes combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayMergeStyle {
    /// The right array replaces the left one.
    #[default]
    Replace,
    /// Elements of the right array are appended after the left ones.
    Concat,
    /// Like `Concat`, skipping right elements already present on the left.
    Union,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeOptions {
    pub object_merge_style: ObjectMergeStyle,
    pub array_merge_style: ArrayMergeStyle,
}

impl SettingsNode {
    /// Layers `other` on top of `self`.
    ///
    /// Nodes of different variants do not combine: the right side wins. A
    /// `Delete` on the left yields to anything; a `Delete` on the right wins.
    pub fn merge(self, other: SettingsNode, options: &MergeOptions) -> SettingsNode {
        match (self, other) {
            (SettingsNode::Object(left), SettingsNode::Object(right)) => {
                SettingsNode::Object(merge_objects(left, right, options))
            }
            (SettingsNode::Array(left), SettingsNode::Array(right)) => {
                SettingsNode::Array(merge_arrays(left, right, options.array_merge_style))
            }
            (_, other) => other,
        }
    }
}

/// Merges two optional trees; an absent side is the identity.
pub fn merge_optional(
    left: Option<SettingsNode>,
    right: Option<SettingsNode>,
    options: &MergeOptions,
) -> Option<SettingsNode> {
    match (left, right) {
        (Some(left), Some(right)) => Some(left.merge(right, options)),
        (left, None) => left,
        (None, right) => right,
    }
}

fn merge_objects(left: ObjectNode, right: ObjectNode, options: &MergeOptions) -> ObjectNode {
    let name = left.shared_name().cloned();
    let mut merged = Vec::with_capacity(left.len().max(right.len()));
    let mut left_children = left.into_children().into_iter().peekable();
    let mut right_children = right.into_children().into_iter().peekable();

    // Both child lists are sorted by name, so a single merge-join pass suffices.
    loop {
        let order = match (left_children.peek(), right_children.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(l), Some(r)) => compare_optional_names(l.name(), r.name()),
        };
        match order {
            Ordering::Less => merged.extend(left_children.next()),
            Ordering::Greater => merged.extend(right_children.next()),
            Ordering::Equal => {
                if let (Some(l), Some(r)) = (left_children.next(), right_children.next()) {
                    merged.push(match options.object_merge_style {
                        ObjectMergeStyle::Deep => l.merge(r, options),
                        ObjectMergeStyle::Shallow => r,
                    });
                }
            }
        }
    }

    ObjectNode::new(name, merged)
}

fn merge_arrays(left: ArrayNode, right: ArrayNode, style: ArrayMergeStyle) -> ArrayNode {
    match style {
        ArrayMergeStyle::Replace => right,
        ArrayMergeStyle::Concat => {
            let name = left.shared_name().cloned();
            let mut children = left.into_children();
            children.extend(right.into_children());
            ArrayNode::new(name, children)
        }
        ArrayMergeStyle::Union => {
            let name = left.shared_name().cloned();
            let mut children = left.into_children();
            for candidate in right.into_children() {
                // Array elements are compared without their positional names.
                let already_present = children
                    .iter()
                    .any(|existing| same_element(existing, &candidate));
                if !already_present {
                    children.push(candidate);
                }
            }
            ArrayNode::new(name, children)
        }
    }
}

fn same_element(a: &SettingsNode, b: &SettingsNode) -> bool {
    a.clone().with_name(None) == b.clone().with_name(None)
}
