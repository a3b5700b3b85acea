//! Backward-sync buffer: absorbs out-of-order blocks arriving while the
//! engine fills the gap between `genesis+1` and a checkpoint it trusts.

pub mod error;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use pubsub::PubSub;
use storage::{PersistentStorage, TypedStore};
use types::events::{topics, BlockEvent};
use types::{Hash, ParentBlock};

pub use error::BlockPoolError;

fn block_key(height: u64) -> String {
    format!("bc.block.{height}")
}

const EARLIEST_KEY: &str = "bc.block.earliest";

pub struct BlockPool {
    store: PersistentStorage,
    pubsub: Arc<PubSub>,
    genesis_hash: Hash,
    checkpoint: Option<ParentBlock>,
    earliest: Option<ParentBlock>,
    /// Blocks seen out of order, below `earliest.height`, not yet linked in.
    cache: HashMap<Hash, ParentBlock>,
}

impl BlockPool {
    pub fn new(store: PersistentStorage, pubsub: Arc<PubSub>, genesis_hash: Hash) -> Result<Self> {
        let earliest = store.get_typed::<ParentBlock>(EARLIEST_KEY)?;
        Ok(Self {
            store,
            pubsub,
            genesis_hash,
            checkpoint: None,
            earliest,
            cache: HashMap::new(),
        })
    }

    fn persist_and_advance_earliest(&mut self, block: ParentBlock) -> Result<()> {
        self.store.put_typed(&block_key(block.height), &block)?;
        self.store.put_typed(EARLIEST_KEY, &block)?;
        self.earliest = Some(block);
        Ok(())
    }

    fn clear_earliest(&mut self) -> Result<()> {
        self.store.delete(EARLIEST_KEY)?;
        self.earliest = None;
        Ok(())
    }

    pub fn add(&mut self, block: ParentBlock) -> Result<()> {
        if self.checkpoint.is_none() {
            return Err(BlockPoolError::NoCheckpoint.into());
        }

        let Some(earliest) = self.earliest.clone() else {
            self.persist_and_advance_earliest(block)?;
            return self.try_drain_cache();
        };

        if block.hash == self.genesis_hash || block.hash == earliest.hash {
            return Ok(());
        }

        if block.hash == earliest.previous_hash && block.previous_hash != earliest.hash {
            if block.previous_hash == self.genesis_hash {
                self.pubsub
                    .publish(topics::STATE_CHECKPOINT_END, &BlockEvent::new(block));
                return self.clear_earliest();
            }
            if block.height == 2 {
                self.pubsub
                    .publish(topics::STATE_RESYNC_FAILED, &BlockEvent::new(block));
                return self.clear_earliest();
            }
            self.persist_and_advance_earliest(block)?;
            return self.try_drain_cache();
        }

        if block.height < earliest.height {
            self.cache.insert(block.hash.clone(), block);
            return Ok(());
        }

        self.persist_and_advance_earliest(block)?;
        self.try_drain_cache()
    }

    /// After `earliest` moves backward, check whether a block the caller
    /// already handed us (out of order) now links directly to it, and if so
    /// feed it back through `add` to keep walking the chain towards genesis.
    fn try_drain_cache(&mut self) -> Result<()> {
        let Some(earliest) = &self.earliest else {
            return Ok(());
        };
        let linked_hash = self
            .cache
            .values()
            .find(|c| c.hash == earliest.previous_hash)
            .map(|c| c.hash.clone());
        match linked_hash {
            Some(hash) => {
                let linked = self.cache.remove(&hash).expect("just matched");
                self.add(linked)
            }
            None => Ok(()),
        }
    }

    pub fn set_checkpoint(&mut self, checkpoint: ParentBlock) {
        self.checkpoint = Some(checkpoint);
    }

    pub fn purge(&mut self, checkpoint: ParentBlock) -> Result<()> {
        let start = checkpoint.height.saturating_sub(1);
        self.checkpoint = Some(checkpoint);
        self.purge_from(start, 1)
    }

    pub fn purge_from(&self, start: u64, end: u64) -> Result<()> {
        let mut h = start;
        while h > end {
            self.store.delete(&block_key(h))?;
            h -= 1;
        }
        Ok(())
    }

    pub fn earliest(&self) -> Option<&ParentBlock> {
        self.earliest.as_ref()
    }
}

#[cfg(test)]
mod test {
    use traits::Persistence;
    use types::{ChildHeaderMap, GenesisParams};

    use super::*;

    fn block(height: u64, hash: &str, previous_hash: &str) -> ParentBlock {
        ParentBlock {
            hash: hash.to_string(),
            previous_hash: previous_hash.to_string(),
            version: 1,
            schema_version: 1,
            height,
            miner: "miner".to_string(),
            difficulty: types::BigIntHex::from_u64(1),
            timestamp_s: height,
            merkle_root: "m".to_string(),
            chain_root: "0".to_string(),
            distance: types::BigIntHex::from_u64(1),
            total_distance: types::BigIntHex::from_u64(height),
            nonce: String::new(),
            nrg_grant: 0,
            genesis: GenesisParams {
                emblem: "e".to_string(),
                tx_fee_base: 0,
                tx_fee_per_byte: 0,
                nrg_target: 0,
            },
            tx_list: vec![],
            tx_count: 0,
            blockchain_headers_count: 0,
            blockchain_headers: ChildHeaderMap::new(),
            blockchain_fingerprints_root: String::new(),
        }
    }

    fn pool() -> BlockPool {
        BlockPool::new(
            PersistentStorage::memory(),
            Arc::new(PubSub::new()),
            "genesis".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn add_without_checkpoint_fails() {
        let mut pool = pool();
        assert!(pool.add(block(5, "a", "b")).is_err());
    }

    #[test]
    fn closing_the_gap_to_genesis_clears_earliest() {
        let mut pool = pool();
        pool.set_checkpoint(block(10, "checkpoint", "c9"));
        pool.add(block(3, "b3", "b2")).unwrap();
        pool.add(block(2, "b2", "genesis")).unwrap();
        assert!(pool.earliest().is_none());
    }

    #[test]
    fn broken_chain_at_height_two_publishes_resync_failed() {
        let mut pool = pool();
        pool.set_checkpoint(block(10, "checkpoint", "c9"));
        pool.add(block(3, "b3", "b2")).unwrap();
        pool.add(block(2, "b2", "not-genesis")).unwrap();
        assert!(pool.earliest().is_none());
    }

    #[test]
    fn out_of_order_block_is_cached_then_linked() {
        let mut pool = pool();
        pool.set_checkpoint(block(10, "checkpoint", "c9"));
        pool.add(block(4, "b4", "b3")).unwrap();
        // b2 arrives before b3: cached, not yet linked.
        pool.add(block(2, "b2", "genesis")).unwrap();
        assert_eq!(pool.earliest().unwrap().height, 4);
        // b3 arrives: links to b2, recurses, and closes the gap.
        pool.add(block(3, "b3", "b2")).unwrap();
        assert!(pool.earliest().is_none());
    }

    #[test]
    fn purge_from_deletes_descending_range() {
        let pool = pool();
        pool.store.put_bytes("bc.block.5", b"x".to_vec()).unwrap();
        pool.store.put_bytes("bc.block.4", b"x".to_vec()).unwrap();
        pool.purge_from(5, 3).unwrap();
        assert!(!pool.store.contains("bc.block.5").unwrap());
        assert!(!pool.store.contains("bc.block.4").unwrap());
    }
}
