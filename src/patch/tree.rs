// clusterconfig-core/src/patch/tree.rs

use std::cmp::Ordering;

use log::debug;

use crate::common::{compare_optional_names, optional_names_equal};
use crate::error::{Result, SettingsError};
use crate::node::{DeleteNode, ObjectNode, SettingsNode};

fn reject_delete(node: &SettingsNode, operand: &str) -> Result<()> {
    if node.is_delete() {
        return Err(SettingsError::InvalidArgument(format!(
            "{}: delete nodes are not supported for patch calculation",
            operand
        )));
    }
    Ok(())
}

fn same_shape(a: &SettingsNode, b: &SettingsNode) -> bool {
    a.same_variant(b) && optional_names_equal(a.name(), b.name())
}

/// Computes the patch that turns `old` into `new`, or `None` when they are equal.
///
/// Values and arrays are replaced wholesale; objects are diffed key by key,
/// with keys missing from `new` turning into `Delete` tombstones.
pub fn get_patch(old: Option<&SettingsNode>, new: Option<&SettingsNode>) -> Result<Option<SettingsNode>> {
    let patch = diff(old, new)?;
    debug!(
        "Tree diff {}.",
        match &patch {
            Some(patch) => format!("produced a {} patch", patch.kind()),
            None => "found no changes".to_string(),
        }
    );
    Ok(patch)
}

fn diff(old: Option<&SettingsNode>, new: Option<&SettingsNode>) -> Result<Option<SettingsNode>> {
    let (old, new) = match (old, new) {
        (None, new) => return Ok(new.cloned()),
        (Some(old), None) => {
            return Ok(Some(SettingsNode::Delete(DeleteNode::new(old.shared_name().cloned()))));
        }
        (Some(old), Some(new)) => (old, new),
    };

    reject_delete(old, "old settings")?;
    reject_delete(new, "new settings")?;

    if !same_shape(old, new) {
        return Ok(Some(new.clone()));
    }

    match (old, new) {
        (SettingsNode::Object(old_object), SettingsNode::Object(new_object)) => {
            let children = diff_children(old_object, new_object)?;
            if children.is_empty() {
                Ok(None)
            } else {
                Ok(Some(SettingsNode::Object(ObjectNode::new(
                    old_object.shared_name().cloned(),
                    children,
                ))))
            }
        }
        _ if old == new => Ok(None),
        _ => Ok(Some(new.clone())),
    }
}

// Walks both sorted child lists in step; every key from either side is visited once.
fn diff_children(old: &ObjectNode, new: &ObjectNode) -> Result<Vec<SettingsNode>> {
    let mut diffs = Vec::new();
    let (mut i, mut j) = (0, 0);
    let (old_children, new_children) = (old.children(), new.children());

    while i < old_children.len() || j < new_children.len() {
        let order = match (old_children.get(i), new_children.get(j)) {
            (Some(o), Some(n)) => compare_optional_names(o.name(), n.name()),
            (Some(_), None) => Ordering::Less,
            _ => Ordering::Greater,
        };
        let child_diff = match order {
            Ordering::Less => {
                i += 1;
                diff(Some(&old_children[i - 1]), None)?
            }
            Ordering::Greater => {
                j += 1;
                diff(None, Some(&new_children[j - 1]))?
            }
            Ordering::Equal => {
                i += 1;
                j += 1;
                diff(Some(&old_children[i - 1]), Some(&new_children[j - 1]))?
            }
        };
        diffs.extend(child_diff);
    }
    Ok(diffs)
}

/// Applies a patch produced by [`get_patch`] to `old`.
///
/// A `Delete` patch removes the whole tree. With no `old` tree the patch is
/// returned as is, matching [`apply_binary_patch`](super::binary::apply_binary_patch).
/// `old` itself must not be a `Delete`.
pub fn apply_patch(old: Option<SettingsNode>, patch: Option<SettingsNode>) -> Result<Option<SettingsNode>> {
    match (old, patch) {
        (old, None) => Ok(old),
        (None, patch) => Ok(patch),
        (_, Some(SettingsNode::Delete(_))) => Ok(None),
        (Some(old), Some(patch)) => apply(old, patch).map(Some),
    }
}

fn apply(old: SettingsNode, patch: SettingsNode) -> Result<SettingsNode> {
    reject_delete(&old, "old settings")?;

    if !same_shape(&old, &patch) {
        return Ok(patch);
    }
    match (old, patch) {
        (SettingsNode::Object(old_object), SettingsNode::Object(patch_object)) => {
            apply_to_object(old_object, patch_object).map(SettingsNode::Object)
        }
        (_, patch) => Ok(patch),
    }
}

fn apply_to_object(old: ObjectNode, patch: ObjectNode) -> Result<ObjectNode> {
    let name = old.shared_name().cloned();
    let mut result = Vec::with_capacity(old.len() + patch.len());
    let mut old_children = old.into_children().into_iter().peekable();
    let mut patch_children = patch.into_children().into_iter().peekable();

    loop {
        if patch_children.peek().is_some_and(|child| child.name().is_none()) {
            return Err(SettingsError::InvalidArgument("Key can't be null".to_string()));
        }
        let order = match (old_children.peek(), patch_children.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(o), Some(p)) => compare_optional_names(o.name(), p.name()),
        };
        match order {
            // Untouched by the patch.
            Ordering::Less => result.extend(old_children.next()),
            // New key: taken from the patch as is, unless it only deletes.
            Ordering::Greater => {
                if let Some(child) = patch_children.next() {
                    if !child.is_delete() {
                        result.push(child);
                    }
                }
            }
            Ordering::Equal => {
                if let (Some(old_child), Some(patch_child)) = (old_children.next(), patch_children.next()) {
                    if !patch_child.is_delete() {
                        result.push(apply(old_child, patch_child)?);
                    }
                }
            }
        }
    }

    Ok(ObjectNode::new(name, result))
}
