//! The hardcoded first block. Every node bootstraps from the same bytes so
//! `bc.block.1`'s hash is identical across installations.

use types::{BigIntHex, ChildHeaderMap, GenesisParams, ParentBlock};

use crate::work::minimum_difficulty;

pub const GENESIS_HASH: &str =
    "7e71e8b54595f3d9659050c3ee906337896a9eb96e74dfb0e702bb3d680e972";
pub const GENESIS_EMBLEM: &str = "aggregator-genesis";

pub fn genesis_params() -> GenesisParams {
    GenesisParams {
        emblem: GENESIS_EMBLEM.to_string(),
        tx_fee_base: 0,
        tx_fee_per_byte: 1,
        nrg_target: 0,
    }
}

/// The single block every `blocks[1]` is seeded with. Has no miner, no
/// predecessor, and a `distance`/`total_distance` of zero.
pub fn genesis_block() -> ParentBlock {
    ParentBlock {
        hash: GENESIS_HASH.to_string(),
        previous_hash: String::new(),
        version: 1,
        schema_version: 1,
        height: 1,
        miner: String::new(),
        difficulty: minimum_difficulty(),
        timestamp_s: 0,
        merkle_root: hashing::h(GENESIS_EMBLEM),
        chain_root: "0".to_string(),
        distance: BigIntHex::zero(),
        total_distance: BigIntHex::zero(),
        nonce: String::new(),
        nrg_grant: 0,
        genesis: genesis_params(),
        tx_list: vec![],
        tx_count: 0,
        blockchain_headers_count: 0,
        blockchain_headers: ChildHeaderMap::new(),
        blockchain_fingerprints_root: String::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn genesis_is_deterministic() {
        assert_eq!(genesis_block().hash, genesis_block().hash);
        assert_eq!(genesis_block().height, 1);
    }
}
