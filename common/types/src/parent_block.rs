use serde::{Deserialize, Serialize};

use crate::bigint::BigIntHex;
use crate::header::ChildHeaderMap;
use crate::{Address, Hash};

/// Genesis-copied tuning parameters every descendant block carries forward
/// unchanged (emblem, tx fee schedule, energy targets).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenesisParams {
    pub emblem: String,
    pub tx_fee_base: u64,
    pub tx_fee_per_byte: u64,
    pub nrg_target: u64,
}

/// A block of the parent chain: it bundles references to external-chain tips
/// alongside its own proof-of-work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParentBlock {
    pub hash: Hash,
    pub previous_hash: Hash,
    pub version: u32,
    pub schema_version: u32,
    pub height: u64,
    pub miner: Address,
    pub difficulty: BigIntHex,
    pub timestamp_s: u64,
    pub merkle_root: Hash,
    pub chain_root: Hash,
    pub distance: BigIntHex,
    pub total_distance: BigIntHex,
    pub nonce: String,
    pub nrg_grant: u64,
    pub genesis: GenesisParams,
    pub tx_list: Vec<String>,
    pub tx_count: u32,
    pub blockchain_headers_count: u32,
    pub blockchain_headers: ChildHeaderMap,
    pub blockchain_fingerprints_root: Hash,
}

impl ParentBlock {
    pub fn header_hash_set(&self) -> std::collections::BTreeSet<&str> {
        self.blockchain_headers.header_hash_set()
    }
}

/// A `ParentBlock` still being assembled: `nonce`/`distance` are unset and
/// `work` is the target the miner measures candidate nonces against. Dropped
/// on solution acceptance, preemption, or cleanup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MiningCandidate {
    pub block: ParentBlock,
    pub work: Hash,
}

/// The result of a successful proof-of-work search, as reported by the
/// out-of-process mining worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub nonce: String,
    pub distance: BigIntHex,
    pub timestamp_s: u64,
    pub difficulty: BigIntHex,
    pub iterations: u64,
    pub time_diff_ms: u64,
}

impl Solution {
    /// `distance > difficulty` is required for acceptance.
    pub fn is_accepted(&self) -> bool {
        self.distance.0 > self.difficulty.0
    }
}
