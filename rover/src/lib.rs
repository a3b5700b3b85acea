//! External-chain tip adapters are out of scope for this core — the engine
//! only consumes the events they emit. This crate is the seam: one trait and
//! the event it hands to `Engine::on_rover_tip`.

use anyhow::Result;
use types::{ChainTag, ChildHeader};

/// A tip observation an external-chain adapter reports to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoverTip {
    pub chain: ChainTag,
    pub header: ChildHeader,
}

/// Implemented by out-of-process chain adapters; the engine never cares how
/// a tip was obtained, only that one arrived.
pub trait RoverTipSource: Send + Sync {
    fn chain(&self) -> ChainTag;

    /// Blocks (in the async sense) until the next tip is available.
    fn next_tip(&self) -> Result<Option<RoverTip>>;
}
