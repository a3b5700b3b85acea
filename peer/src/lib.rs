//! Peer discovery, connection, and RPC framing are out of scope for this
//! core. This crate is the seam: the RPC surface the engine calls against a
//! connected peer, and the surface a peer calls against this node.

use anyhow::Result;
use async_trait::async_trait;
use types::ParentBlock;

/// A block range endpoint: `[height, hash]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeEndpoint {
    pub height: u64,
    pub hash: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRequest {
    pub query_hash: String,
    pub query_height: u64,
    pub low: u64,
    pub high: u64,
}

/// Max number of blocks any single RPC response may carry.
pub const MAX_RANGE: u64 = 100_000;

/// The RPC methods the engine calls against a connected peer, and a peer
/// calls against this node, to drive backward sync.
#[async_trait]
pub trait PeerRpc: Send + Sync {
    /// Inclusive range `[from, to]`. Rejects if `to.height - from.height >
    /// MAX_RANGE` or either endpoint's hash doesn't match what's stored at
    /// its height.
    async fn get_headers(&self, from: RangeEndpoint, to: RangeEndpoint) -> Result<Vec<ParentBlock>>;

    async fn get_latest_header(&self) -> Result<Option<ParentBlock>>;

    /// Up to `min(count, height, MAX_RANGE)` most recent blocks.
    async fn get_latest_headers(&self, count: u64) -> Result<Vec<ParentBlock>>;

    /// Up to 7 most recent blocks.
    async fn get_multiverse(&self) -> Result<Vec<ParentBlock>>;

    /// Blocks at heights `[max(1, low) .. min(high, latest.height)]`, iff the
    /// block at `query_height` has hash `query_hash`; otherwise empty.
    async fn query(&self, request: QueryRequest) -> Result<Vec<ParentBlock>>;
}
