// clusterconfig-core/src/subtree/hash.rs

/// Hex-encoded blake3 digest of an encoded subtree.
///
/// Equal trees encode to equal bytes, so the digest works as a version tag for
/// slices taken out of a [`SubtreesMap`](super::SubtreesMap).
pub fn subtree_hash(encoded: &[u8]) -> String {
    hex::encode(blake3::hash(encoded).as_bytes())
}
