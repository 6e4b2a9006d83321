// clusterconfig-core/src/patch/binary.rs

use std::cmp::Ordering;

use log::{debug, trace};

use crate::codec::format::{NodeType, MAX_NODE_DEPTH};
use crate::codec::reader::NodeReader;
use crate::codec::writer::NodeWriter;
use crate::common::compare_names;
use crate::error::{Result, SettingsError};

/// Applies encoded patches to encoded trees.
///
/// Transport code depends on this trait rather than on a concrete serializer.
pub trait BinaryPatcher {
    fn apply_patch(&self, settings: &[u8], patch: &[u8]) -> Result<Vec<u8>>;
}

/// Merges an encoded `patch` into encoded `settings`, producing the encoded result.
///
/// Neither input is decoded: unchanged subtrees are copied byte for byte and
/// Object children are merged in one pass over both key-sorted child lists, so
/// the work is proportional to the patch rather than to the whole tree.
/// A patch that deletes the root yields an empty buffer.
pub fn apply_binary_patch(settings: &[u8], patch: &[u8], capacity: usize) -> Result<Vec<u8>> {
    if patch.is_empty() {
        return Ok(settings.to_vec());
    }
    if settings.is_empty() {
        return Ok(patch.to_vec());
    }

    let mut settings_reader = NodeReader::new(settings, None);
    let mut patch_reader = NodeReader::new(patch, None);
    let mut result = NodeWriter::with_capacity(capacity.max(settings.len()));

    merge_any(&mut settings_reader, &mut patch_reader, &mut result, 0)?;
    settings_reader.ensure_exhausted()?;
    patch_reader.ensure_exhausted()?;

    let result = result.into_bytes();
    trace!(
        "Applied {}-byte patch to {}-byte tree; result is {} bytes.",
        patch.len(),
        settings.len(),
        result.len()
    );
    if result.is_empty() {
        debug!("Binary patch deleted the whole tree.");
    }
    Ok(result)
}

fn merge_any(settings: &mut NodeReader<'_, '_>, patch: &mut NodeReader<'_, '_>, result: &mut NodeWriter, depth: usize) -> Result<()> {
    if depth > MAX_NODE_DEPTH {
        return Err(SettingsError::DepthLimitExceeded(MAX_NODE_DEPTH));
    }

    let settings_type = settings.peek_header()?.node_type;
    let patch_type = patch.peek_header()?.node_type;

    if patch_type == NodeType::Delete {
        settings.skip_node()?;
        return patch.skip_node();
    }
    if settings_type == NodeType::Object && patch_type == NodeType::Object {
        return merge_objects(settings, patch, result, depth);
    }
    // Values, arrays and type changes are replaced wholesale.
    settings.skip_node()?;
    patch.copy_node_to(result.inner_mut())
}

fn merge_objects(settings: &mut NodeReader<'_, '_>, patch: &mut NodeReader<'_, '_>, result: &mut NodeWriter, depth: usize) -> Result<()> {
    let settings_start = settings.position();
    let settings_header = settings.expect_header(NodeType::Object)?;
    let patch_start = patch.position();
    let patch_header = patch.expect_header(NodeType::Object)?;

    let open = result.begin_node(NodeType::Object)?;
    let count_slot = result.reserve_count()?;

    let mut settings_left = settings.read_count()?;
    let mut patch_left = patch.read_count()?;
    let mut settings_key: Option<&str> = None;
    let mut patch_key: Option<&str> = None;
    let mut count = 0usize;

    loop {
        if settings_key.is_none() && settings_left > 0 {
            settings_key = Some(settings.read_key()?);
            settings_left -= 1;
        }
        if patch_key.is_none() && patch_left > 0 {
            patch_key = Some(patch.read_key()?);
            patch_left -= 1;
        }

        let order = match (settings_key, patch_key) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(s), Some(p)) => compare_names(s, p),
        };

        match order {
            Ordering::Less => {
                if let Some(key) = settings_key.take() {
                    result.write_key(key)?;
                    settings.copy_node_to(result.inner_mut())?;
                    count += 1;
                }
            }
            Ordering::Greater => {
                if let Some(key) = patch_key.take() {
                    result.write_key(key)?;
                    patch.copy_node_to(result.inner_mut())?;
                    count += 1;
                }
            }
            Ordering::Equal => {
                let key = patch_key.take();
                settings_key = None;
                if patch.peek_header()?.node_type == NodeType::Delete {
                    settings.skip_node()?;
                    patch.skip_node()?;
                } else if let Some(key) = key {
                    result.write_key(key)?;
                    merge_any(settings, patch, result, depth + 1)?;
                    count += 1;
                }
            }
        }
    }

    settings.ensure_node_end(settings_start, settings_header)?;
    patch.ensure_node_end(patch_start, patch_header)?;
    result.fill_count(count_slot, count)?;
    result.end_node(open)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::serializer::TreeSerializer;
    use crate::node::{SettingsNode, TreeBuilder};

    fn encode(tree: Option<&SettingsNode>) -> Vec<u8> {
        TreeSerializer::new().serialize(tree).unwrap()
    }

    fn patch_bytes(settings: &[u8], patch: &[u8]) -> Vec<u8> {
        apply_binary_patch(settings, patch, 64).unwrap()
    }

    #[test]
    fn empty_sides_pass_the_other_through() {
        let tree = encode(Some(&SettingsNode::root(vec![SettingsNode::value("a", "1")])));
        assert_eq!(patch_bytes(&tree, &[]), tree);
        assert_eq!(patch_bytes(&[], &tree), tree);
        assert!(patch_bytes(&[], &[]).is_empty());
    }

    #[test]
    fn root_delete_empties_the_buffer() {
        let tree = encode(TreeBuilder::new().add("a/b", "1").build().as_ref());
        let delete = encode(Some(&SettingsNode::unnamed_delete()));
        assert!(patch_bytes(&tree, &delete).is_empty());
    }

    #[test]
    fn merge_join_produces_sorted_children() {
        let settings = SettingsNode::root(vec![
            SettingsNode::value("a", "1"),
            SettingsNode::value("c", "3"),
            SettingsNode::value("e", "5"),
        ]);
        let patch = SettingsNode::root(vec![
            SettingsNode::value("B", "2"),
            SettingsNode::delete("c"),
            SettingsNode::value("e", "50"),
            SettingsNode::value("f", "6"),
        ]);
        let expected = SettingsNode::root(vec![
            SettingsNode::value("a", "1"),
            SettingsNode::value("B", "2"),
            SettingsNode::value("e", "50"),
            SettingsNode::value("f", "6"),
        ]);
        let result = patch_bytes(&encode(Some(&settings)), &encode(Some(&patch)));
        assert_eq!(result, encode(Some(&expected)));
    }

    #[test]
    fn type_change_replaces_the_node() {
        let settings = SettingsNode::root(vec![SettingsNode::object("a", vec![SettingsNode::value("x", "1")])]);
        let patch = SettingsNode::root(vec![SettingsNode::array_of_values(Some("a".into()), ["1"])]);
        let result = patch_bytes(&encode(Some(&settings)), &encode(Some(&patch)));
        assert_eq!(result, encode(Some(&patch)));
    }

    #[test]
    fn nested_objects_are_merged_recursively() {
        let settings = TreeBuilder::new().add("a/b/c", "1").add("a/b/d", "2").add("z", "0").build();
        let new = TreeBuilder::new().add("a/b/c", "1").add("a/b/d", "3").add("z", "0").build();
        let patch = crate::patch::tree::get_patch(settings.as_ref(), new.as_ref()).unwrap();
        let result = patch_bytes(&encode(settings.as_ref()), &encode(patch.as_ref()));
        assert_eq!(result, encode(new.as_ref()));
    }

    #[test]
    fn patch_only_keys_are_copied_verbatim() {
        let settings = SettingsNode::root(vec![SettingsNode::value("a", "1")]);
        let patch = SettingsNode::root(vec![SettingsNode::delete("b")]);
        let result = patch_bytes(&encode(Some(&settings)), &encode(Some(&patch)));
        let expected = SettingsNode::root(vec![SettingsNode::value("a", "1"), SettingsNode::delete("b")]);
        assert_eq!(result, encode(Some(&expected)));
    }

    #[test]
    fn corrupt_patch_is_an_error() {
        let tree = encode(Some(&SettingsNode::root(vec![SettingsNode::value("a", "1")])));
        assert!(matches!(
            apply_binary_patch(&tree, &[0x0b, 0, 0, 0, 0], 64),
            Err(SettingsError::UnknownNodeType(0x0b))
        ));
        let truncated = &tree[..tree.len() - 1];
        assert!(matches!(
            apply_binary_patch(&tree, truncated, 64),
            Err(SettingsError::Truncated { .. })
        ));
    }

    #[test]
    fn trailing_bytes_are_malformed() {
        let settings = encode(Some(&SettingsNode::root(vec![SettingsNode::value("a", "1")])));
        let patch = encode(Some(&SettingsNode::root(vec![SettingsNode::value("b", "2")])));

        let mut dirty_settings = settings.clone();
        dirty_settings.extend_from_slice(&[0xde, 0xad]);
        assert!(matches!(
            apply_binary_patch(&dirty_settings, &patch, 64),
            Err(SettingsError::Malformed(_))
        ));

        let mut dirty_patch = patch.clone();
        dirty_patch.push(0);
        assert!(matches!(
            apply_binary_patch(&settings, &dirty_patch, 64),
            Err(SettingsError::Malformed(_))
        ));
    }

    #[test]
    fn object_longer_than_its_children_is_malformed() {
        let mut settings = encode(Some(&SettingsNode::root(vec![SettingsNode::value("a", "1")])));
        let declared = i32::from_le_bytes([settings[1], settings[2], settings[3], settings[4]]) + 2;
        settings[1..5].copy_from_slice(&declared.to_le_bytes());
        settings.extend_from_slice(&[0, 0]);
        let patch = encode(Some(&SettingsNode::root(vec![SettingsNode::value("b", "2")])));

        assert!(matches!(
            apply_binary_patch(&settings, &patch, 64),
            Err(SettingsError::Malformed(_))
        ));
        assert!(matches!(
            apply_binary_patch(&patch, &settings, 64),
            Err(SettingsError::Malformed(_))
        ));
    }
}
