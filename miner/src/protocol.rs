//! The line-delimited JSON contract between the engine and the mining
//! worker subprocess: one request in, one reply out.

use serde::{Deserialize, Serialize};
use types::BigIntHex;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DifficultyData {
    pub current_timestamp_s: u64,
    /// JSON-serialized `ParentBlock` of the tip being mined on top of, so the
    /// worker can rederive `get_diff` if the wall clock second advances.
    pub prev_block_bytes: String,
    /// JSON-serialized `ChildHeaderMap` of the headers going into the
    /// candidate, used for the `new_block_count` term of `get_diff`.
    pub new_headers_bytes: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkRequest {
    pub current_timestamp_s: u64,
    pub offset_ms: i64,
    pub work: String,
    pub miner_key: String,
    pub merkle_root: String,
    pub difficulty: BigIntHex,
    pub difficulty_data: DifficultyData,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkSolution {
    pub nonce: String,
    pub distance: BigIntHex,
    pub timestamp_s: u64,
    pub difficulty: BigIntHex,
    pub iterations: u64,
    pub time_diff_ms: u64,
}

impl From<WorkSolution> for types::Solution {
    fn from(s: WorkSolution) -> Self {
        types::Solution {
            nonce: s.nonce,
            distance: s.distance,
            timestamp_s: s.timestamp_s,
            difficulty: s.difficulty,
            iterations: s.iterations,
            time_diff_ms: s.time_diff_ms,
        }
    }
}
