// clusterconfig-core/src/lib.rs

//! Settings tree model, binary codec and patch engine for distributing
//! hierarchical cluster configuration.
//!
//! Trees of [`SettingsNode`]s are encoded by [`TreeSerializer`] into a
//! length-prefixed format whose Object children are sorted by
//! case-insensitive key. That order lets [`apply_binary_patch`] merge an
//! encoded patch into an encoded tree in one linear pass, and lets
//! [`SubtreesMapBuilder`] index every subtree without decoding it.

pub mod codec;
pub mod common;
pub mod error;
pub mod intern;
pub mod node;
pub mod patch;
pub mod subtree;

#[cfg(test)]
mod proptests;

pub use codec::{NodeType, TreeSerializer};
pub use common::{CodecConfig, NodeName, SharedStr};
pub use error::{Result, SettingsError};
pub use intern::StringInterner;
pub use node::{
    merge_optional, split_path, ArrayMergeStyle, ArrayNode, DeleteNode, MergeOptions, ObjectMergeStyle, ObjectNode,
    SettingsNode, TreeBuilder, ValueNode,
};
pub use patch::{apply_binary_patch, apply_patch, get_patch, BinaryPatcher};
pub use subtree::{subtree_hash, Subtree, SubtreeRequest, SubtreesMap, SubtreesMapBuilder};
