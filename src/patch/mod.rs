// clusterconfig-core/src/patch/mod.rs

pub mod binary;
pub mod tree;

pub use binary::{apply_binary_patch, BinaryPatcher};
pub use tree::{apply_patch, get_patch};
