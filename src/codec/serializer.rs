// clusterconfig-core/src/codec/serializer.rs

use log::{debug, trace};

use super::reader::NodeReader;
use super::writer::NodeWriter;
use crate::common::CodecConfig;
use crate::error::Result;
use crate::intern::StringInterner;
use crate::node::SettingsNode;
use crate::patch::binary::{apply_binary_patch, BinaryPatcher};
use crate::subtree::map_builder::{SubtreesMap, SubtreesMapBuilder};

/// Entry point to the binary tree format.
///
/// An empty buffer is the encoding of "no tree". Decoded strings go through
/// the optional interner; the serializer is cheap to clone and safe to share
/// between threads.
#[derive(Debug, Clone, Default)]
pub struct TreeSerializer {
    interner: Option<StringInterner>,
    config: CodecConfig,
}

impl TreeSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interner(interner: StringInterner) -> Self {
        Self {
            interner: Some(interner),
            config: CodecConfig::default(),
        }
    }

    pub fn from_config(config: &CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            interner: config.interning_cache_capacity.map(StringInterner::new),
            config: config.clone(),
        })
    }

    pub fn interner(&self) -> Option<&StringInterner> {
        self.interner.as_ref()
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn serialize(&self, tree: Option<&SettingsNode>) -> Result<Vec<u8>> {
        let Some(tree) = tree else {
            return Ok(Vec::new());
        };
        let mut writer = NodeWriter::with_capacity(self.config.initial_buffer_capacity);
        writer.write_node(tree, 0)?;
        let bytes = writer.into_bytes();
        trace!("Serialized {} tree into {} bytes.", tree.kind(), bytes.len());
        Ok(bytes)
    }

    pub fn deserialize(&self, bytes: &[u8]) -> Result<Option<SettingsNode>> {
        if bytes.is_empty() {
            return Ok(None);
        }
        let mut reader = NodeReader::new(bytes, self.interner.as_ref());
        let tree = reader.read_node(None, 0)?;
        reader.ensure_exhausted()?;
        Ok(Some(tree))
    }

    /// Decodes only the node at `path`, skipping everything else.
    ///
    /// The empty path addresses the whole tree. A missing path is `Ok(None)`.
    pub fn deserialize_path<I, S>(&self, bytes: &[u8], path: I) -> Result<Option<SettingsNode>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if bytes.is_empty() {
            return Ok(None);
        }
        let segments: Vec<S> = path.into_iter().collect();
        if segments.is_empty() {
            return self.deserialize(bytes);
        }
        let mut reader = NodeReader::new(bytes, self.interner.as_ref());
        let found = reader.read_node_at_path(&segments, None, 0)?;
        trace!(
            "Path lookup of {} segments {}.",
            segments.len(),
            if found.is_some() { "succeeded" } else { "found nothing" }
        );
        Ok(found)
    }

    /// Applies an encoded patch to an encoded tree without decoding either.
    pub fn apply_patch(&self, settings: &[u8], patch: &[u8]) -> Result<Vec<u8>> {
        apply_binary_patch(settings, patch, self.config.initial_buffer_capacity)
    }

    /// Indexes every node of an encoded tree by its path.
    pub fn build_subtrees_map<'a>(&self, bytes: &'a [u8]) -> Result<SubtreesMap<'a>> {
        let map = SubtreesMapBuilder::new(bytes, self.interner.as_ref()).build()?;
        debug!("Indexed {} subtrees over {} bytes.", map.len(), bytes.len());
        Ok(map)
    }
}

impl BinaryPatcher for TreeSerializer {
    fn apply_patch(&self, settings: &[u8], patch: &[u8]) -> Result<Vec<u8>> {
        TreeSerializer::apply_patch(self, settings, patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SettingsError;
    use crate::node::{TreeBuilder, ValueNode};
    use std::sync::Arc;

    fn round_trip(tree: Option<SettingsNode>) {
        let serializer = TreeSerializer::new();
        let bytes = serializer.serialize(tree.as_ref()).unwrap();
        assert_eq!(serializer.deserialize(&bytes).unwrap(), tree);
    }

    fn sample_tree() -> SettingsNode {
        TreeBuilder::new()
            .add("foo/bar/baz", "3")
            .add("foo/bar/bat", "4")
            .add("one/two", "three")
            .add_array("plain-array", ["value1", "value2"])
            .build()
            .unwrap()
    }

    #[test]
    fn absent_tree_is_an_empty_buffer() {
        let serializer = TreeSerializer::new();
        assert!(serializer.serialize(None).unwrap().is_empty());
        assert_eq!(serializer.deserialize(&[]).unwrap(), None);
        assert_eq!(serializer.deserialize_path(&[], ["foo"]).unwrap(), None);
    }

    #[test]
    fn round_trips_single_nodes() {
        round_trip(None);
        round_trip(Some(SettingsNode::unnamed_value("value")));
        round_trip(Some(SettingsNode::unnamed_value("")));
        round_trip(Some(SettingsNode::array_of_values(None, ["1", "2", "3"])));
        round_trip(Some(SettingsNode::root(vec![])));
        round_trip(Some(SettingsNode::unnamed_delete()));
    }

    #[test]
    fn round_trips_complex_trees() {
        round_trip(Some(sample_tree()));
        round_trip(Some(SettingsNode::root(vec![
            SettingsNode::object("empty", vec![]),
            SettingsNode::delete("removed"),
            SettingsNode::unnamed_array(vec![]).with_name(Some("nested".into())),
            SettingsNode::array(
                "arrays",
                vec![
                    SettingsNode::array_of_values(None, ["a"]),
                    SettingsNode::root(vec![SettingsNode::value("k", "v")]),
                    SettingsNode::unnamed_array(vec![]),
                ],
            ),
            SettingsNode::value("unicode", "значение"),
        ])));
    }

    #[test]
    fn absent_value_decodes_as_empty() {
        let serializer = TreeSerializer::new();
        let bytes = serializer
            .serialize(Some(&SettingsNode::Value(ValueNode::new(None, None))))
            .unwrap();
        assert_eq!(serializer.deserialize(&bytes).unwrap(), Some(SettingsNode::unnamed_value("")));
    }

    #[test]
    fn path_navigation() {
        let serializer = TreeSerializer::new();
        let bytes = serializer.serialize(Some(&sample_tree())).unwrap();
        let lookup = |path: &str| {
            serializer
                .deserialize_path(&bytes, crate::node::split_path(path))
                .unwrap()
        };

        assert_eq!(lookup("foo/bar/baz"), Some(SettingsNode::value("baz", "3")));
        assert_eq!(lookup("FOO/Bar/BAZ"), Some(SettingsNode::value("baz", "3")));
        assert_eq!(lookup("one/two"), Some(SettingsNode::value("two", "three")));
        assert_eq!(
            lookup("foo/bar"),
            Some(SettingsNode::object(
                "bar",
                vec![SettingsNode::value("bat", "4"), SettingsNode::value("baz", "3")]
            ))
        );
        assert_eq!(lookup(""), Some(sample_tree()));
        assert_eq!(lookup("foo/bar/baz/deeper"), None);
        assert_eq!(lookup("plain-array/value1"), None);
        assert_eq!(lookup("plain-array/0"), None);
        assert_eq!(lookup("foo/nope"), None);
        assert_eq!(lookup("zzz"), None);
    }

    #[test]
    fn found_node_is_named_by_its_stored_key() {
        let serializer = TreeSerializer::new();
        let bytes = serializer
            .serialize(Some(&SettingsNode::root(vec![SettingsNode::value("Key", "v")])))
            .unwrap();
        let found = serializer.deserialize_path(&bytes, ["KEY"]).unwrap().unwrap();
        assert_eq!(found.name(), Some("Key"));
    }

    #[test]
    fn trailing_bytes_are_malformed() {
        let serializer = TreeSerializer::new();
        let mut bytes = serializer.serialize(Some(&SettingsNode::unnamed_value("x"))).unwrap();
        bytes.push(0);
        assert!(matches!(serializer.deserialize(&bytes), Err(SettingsError::Malformed(_))));
    }

    #[test]
    fn unknown_root_tag_is_reported() {
        let serializer = TreeSerializer::new();
        assert!(matches!(
            serializer.deserialize(&[0x07, 0, 0, 0, 0]),
            Err(SettingsError::UnknownNodeType(0x07))
        ));
    }

    #[test]
    fn truncated_buffer_is_reported() {
        let serializer = TreeSerializer::new();
        let bytes = serializer.serialize(Some(&sample_tree())).unwrap();
        for cut in [1, 4, 5, bytes.len() / 2, bytes.len() - 1] {
            let result = serializer.deserialize(&bytes[..cut]);
            assert!(matches!(result, Err(SettingsError::Truncated { .. })), "cut at {}", cut);
        }
    }

    #[test]
    fn interned_strings_are_shared() {
        let serializer = TreeSerializer::from_config(&CodecConfig {
            interning_cache_capacity: Some(1024),
            ..CodecConfig::default()
        })
        .unwrap();
        let tree = TreeBuilder::new()
            .add("foo/bar/baz", "00:01:00")
            .add("foo/bar/qux", "00:01:00")
            .add("baz/foo", "00:01:00")
            .build()
            .unwrap();
        let bytes = serializer.serialize(Some(&tree)).unwrap();
        let decoded = serializer.deserialize(&bytes).unwrap().unwrap();
        let interner = serializer.interner().unwrap();

        let canonical_value = interner.get("00:01:00").unwrap();
        let canonical_foo = interner.get("foo").unwrap();
        let canonical_baz = interner.get("baz").unwrap();
        for node in decoded.descendants() {
            if let SettingsNode::Value(value) = node {
                assert!(Arc::ptr_eq(value.shared_value().unwrap(), &canonical_value));
            }
            let name = node.shared_name();
            if node.name() == Some("foo") {
                assert!(Arc::ptr_eq(name.unwrap(), &canonical_foo));
            }
            if node.name() == Some("baz") {
                assert!(Arc::ptr_eq(name.unwrap(), &canonical_baz));
            }
        }
    }

    #[test]
    fn binary_patcher_trait_is_implemented() {
        let serializer = TreeSerializer::new();
        let patcher: &dyn BinaryPatcher = &serializer;
        let tree = serializer.serialize(Some(&sample_tree())).unwrap();
        let delete = serializer.serialize(Some(&SettingsNode::unnamed_delete())).unwrap();
        assert!(patcher.apply_patch(&tree, &delete).unwrap().is_empty());
    }

    #[test]
    fn subtrees_map_outlives_the_serializer() {
        let bytes = TreeSerializer::new().serialize(Some(&sample_tree())).unwrap();
        let map = {
            let serializer = TreeSerializer::from_config(&CodecConfig {
                interning_cache_capacity: Some(64),
                ..CodecConfig::default()
            })
            .unwrap();
            serializer.build_subtrees_map(&bytes).unwrap()
        };
        assert!(map.contains("foo/bar"));
        assert_eq!(map.get("").unwrap(), &bytes[..]);
    }

    #[test]
    fn supplementary_plane_keys_are_written_first_and_found() {
        let serializer = TreeSerializer::new();
        let tree = SettingsNode::root(vec![
            SettingsNode::value("\u{E000}", "private"),
            SettingsNode::value("\u{10000}", "linear-b"),
        ]);
        let bytes = serializer.serialize(Some(&tree)).unwrap();
        // header (5) + count (4) + first key length (4)
        assert_eq!(&bytes[9..13], &4i32.to_le_bytes());
        assert_eq!(&bytes[13..17], "\u{10000}".as_bytes());

        for (key, value) in [("\u{10000}", "linear-b"), ("\u{E000}", "private")] {
            let found = serializer.deserialize_path(&bytes, [key]).unwrap();
            assert_eq!(found, Some(SettingsNode::value(key, value)));
        }
    }
}
