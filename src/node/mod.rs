// clusterconfig-core/src/node/mod.rs

pub mod builder;
pub mod definition;
pub mod merge;

pub use builder::{split_path, TreeBuilder};
pub use definition::{ArrayNode, DeleteNode, ObjectNode, SettingsNode, ValueNode};
pub use merge::{merge_optional, ArrayMergeStyle, MergeOptions, ObjectMergeStyle};
