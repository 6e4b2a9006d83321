// clusterconfig-core/src/codec/mod.rs

pub mod buffer;
pub mod format;
pub mod reader;
pub mod serializer;
pub mod writer;

pub use format::{NodeHeader, NodeType, HEADER_SIZE, MAX_NODE_DEPTH};
pub use serializer::TreeSerializer;
