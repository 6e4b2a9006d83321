// clusterconfig-core/src/proptests.rs

use super::*;

use proptest::prelude::*;

// Lower-case names keep old and new keys byte-identical when they match.
const LOWER_NAMES: &str = "[a-e]{1,2}";
// Mixed case interleaves keys that differ only by case under the sort order.
const MIXED_NAMES: &str = "[a-cA-C]{1,2}";

fn node_strategy(names: &'static str) -> impl Strategy<Value = SettingsNode> {
    let leaf = "[a-z0-9:]{0,4}".prop_map(|value: String| SettingsNode::unnamed_value(value));
    leaf.prop_recursive(4, 64, 6, move |inner| {
        prop_oneof![
            1 => prop::collection::vec(inner.clone(), 0..4).prop_map(SettingsNode::unnamed_array),
            3 => prop::collection::vec((names, inner), 0..6).prop_map(|entries| {
                SettingsNode::root(
                    entries
                        .into_iter()
                        .map(|(key, node)| node.with_name(Some(key.into())))
                        .collect(),
                )
            }),
        ]
    })
}

fn tree_strategy(names: &'static str) -> impl Strategy<Value = Option<SettingsNode>> {
    let root = prop::collection::vec((names, node_strategy(names)), 0..8).prop_map(|entries| {
        SettingsNode::root(
            entries
                .into_iter()
                .map(|(key, node)| node.with_name(Some(key.into())))
                .collect(),
        )
    });
    prop_oneof![
        1 => Just(None),
        9 => root.prop_map(Some),
    ]
}

fn encode(tree: Option<&SettingsNode>) -> Vec<u8> {
    TreeSerializer::new().serialize(tree).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_serialization_round_trip(tree in tree_strategy(MIXED_NAMES)) {
        let serializer = TreeSerializer::new();
        let bytes = serializer.serialize(tree.as_ref()).unwrap();
        prop_assert_eq!(bytes.is_empty(), tree.is_none());
        prop_assert_eq!(serializer.deserialize(&bytes).unwrap(), tree);
    }

    #[test]
    fn prop_tree_patch_round_trip(old in tree_strategy(MIXED_NAMES), new in tree_strategy(MIXED_NAMES)) {
        let patch = get_patch(old.as_ref(), new.as_ref()).unwrap();
        prop_assert_eq!(apply_patch(old.clone(), patch).unwrap(), new);
        prop_assert_eq!(get_patch(old.as_ref(), old.as_ref()).unwrap(), None);
    }

    #[test]
    fn prop_binary_patch_matches_encoded_new_tree(old in tree_strategy(LOWER_NAMES), new in tree_strategy(LOWER_NAMES)) {
        let serializer = TreeSerializer::new();
        let patch = get_patch(old.as_ref(), new.as_ref()).unwrap();

        let result = serializer
            .apply_patch(&encode(old.as_ref()), &encode(patch.as_ref()))
            .unwrap();

        prop_assert_eq!(&result, &encode(new.as_ref()));
    }

    #[test]
    fn prop_binary_patch_agrees_with_tree_patch(old in tree_strategy(MIXED_NAMES), new in tree_strategy(MIXED_NAMES)) {
        let serializer = TreeSerializer::new();
        let patch = get_patch(old.as_ref(), new.as_ref()).unwrap();

        let result = serializer
            .apply_patch(&encode(old.as_ref()), &encode(patch.as_ref()))
            .unwrap();
        let decoded = serializer.deserialize(&result).unwrap();

        prop_assert_eq!(&decoded, &new);
        prop_assert_eq!(decoded, apply_patch(old, patch).unwrap());
    }

    #[test]
    fn prop_subtrees_map_slices_decode_to_scoped_nodes(tree in tree_strategy(MIXED_NAMES)) {
        let serializer = TreeSerializer::new();
        let bytes = encode(tree.as_ref());
        let map = serializer.build_subtrees_map(&bytes).unwrap();
        prop_assert_eq!(map.is_empty(), tree.is_none());

        if let Some(tree) = &tree {
            for (path, slice) in map.iter() {
                let expected = tree.scope_to(split_path(path)).cloned().map(|node| node.with_name(None));
                prop_assert!(expected.is_some(), "path {:?} not in tree", path);
                prop_assert_eq!(serializer.deserialize(slice).unwrap(), expected);
            }
        }
    }

    #[test]
    fn prop_path_decode_matches_scope_to(
        tree in tree_strategy(MIXED_NAMES),
        path in prop::collection::vec(MIXED_NAMES, 0..4),
    ) {
        let serializer = TreeSerializer::new();
        let bytes = encode(tree.as_ref());
        let decoded = serializer.deserialize_path(&bytes, &path).unwrap();
        let expected = tree.as_ref().and_then(|tree| tree.scope_to(&path)).cloned();
        prop_assert_eq!(decoded, expected);
    }
}
