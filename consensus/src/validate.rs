//! Structural checks applied to a freshly mined or peer-delivered block
//! against the parent it claims to extend.

use types::ParentBlock;

pub fn block_hash(previous_hash: &str, merkle_root: &str) -> String {
    hashing::h2(previous_hash.as_bytes(), merkle_root.as_bytes())
}

/// `block` must extend `prev` directly, carry a hash consistent with its own
/// fields, accumulate `total_distance` correctly, and clear its own
/// difficulty target.
pub fn is_valid_block(block: &ParentBlock, prev: &ParentBlock) -> bool {
    block.hash == block_hash(&block.previous_hash, &block.merkle_root)
        && block.previous_hash == prev.hash
        && block.height == prev.height + 1
        && block.total_distance.0 == prev.total_distance.0.clone() + block.distance.0.clone()
        && block.distance.0 > block.difficulty.0
}
