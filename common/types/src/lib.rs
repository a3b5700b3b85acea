pub mod bigint;
pub mod chain;
pub mod config;
pub mod events;
pub mod header;
pub mod parent_block;

/// Hex-encoded Blake2 digest. The hashing primitive itself lives in `hashing`;
/// this crate only moves the hex string around.
pub type Hash = String;

/// Hex-encoded miner/beneficiary address. This core never validates
/// addresses, it only carries them through to the mined block.
pub type Address = String;

pub use bigint::BigIntHex;
pub use chain::ChainTag;
pub use header::{ChildHeader, ChildHeaderMap};
pub use parent_block::{MiningCandidate, ParentBlock, Solution};
