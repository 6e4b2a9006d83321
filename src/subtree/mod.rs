// clusterconfig-core/src/subtree/mod.rs

pub mod hash;
pub mod map_builder;
pub mod protocol;

pub use hash::subtree_hash;
pub use map_builder::{SubtreesMap, SubtreesMapBuilder};
pub use protocol::{
    deserialize_requests, deserialize_response, serialize_requests, serialize_response, Subtree, SubtreeRequest,
};
