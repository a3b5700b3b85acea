use serde::{Deserialize, Serialize};

use crate::parent_block::ParentBlock;

/// Well-known pub/sub topics (spec §6). The bus itself treats topics as
/// free-form strings; these constants just keep the engine and its
/// subscribers from typo-ing each other's wiring.
pub mod topics {
    pub const STATE_BLOCK_HEIGHT: &str = "state.block.height";
    pub const UPDATE_BLOCK_LATEST: &str = "update.block.latest";
    pub const UPDATE_CHECKPOINT_START: &str = "update.checkpoint.start";
    pub const STATE_CHECKPOINT_END: &str = "state.checkpoint.end";
    pub const STATE_RESYNC_FAILED: &str = "state.resync.failed";
    pub const BLOCK_MINED: &str = "block.mined";
}

/// Payload shape shared by every pub/sub topic in this system.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockEvent {
    pub key: Option<String>,
    pub data: ParentBlock,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub multiverse: Vec<ParentBlock>,
    #[serde(default)]
    pub purge: Option<u64>,
}

impl BlockEvent {
    pub fn new(data: ParentBlock) -> Self {
        Self {
            key: None,
            data,
            force: false,
            multiverse: Vec::new(),
            purge: None,
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}
