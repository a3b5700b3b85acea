//! The coordinator: ties the clock, the multiverse, the block pool, the
//! pub/sub bus, and the out-of-process mining worker into the state machine
//! described for this core. Mirrors the shape of the teacher's own
//! `node::node::run` event loop, but as an explicitly-constructed value whose
//! handlers the owning binary's `tokio::select!` loop calls into, rather than
//! a free function that owns the loop itself.

pub mod error;

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use lru::LruCache;
use tracing::warn;

use clock::Clock;
use miner::{DifficultyData, WorkRequest, WorkerHandle};
use multiverse::Multiverse;
use peer::{PeerRpc, QueryRequest};
use pubsub::PubSub;
use storage::{PersistentStorage, TypedStore};
use types::events::{topics, BlockEvent};
use types::{BigIntHex, ChainTag, ChildHeader, ChildHeaderMap, Hash, ParentBlock};

pub use error::EngineError;

const LATEST_KEY: &str = "bc.block.latest";
const ROVERS_KEY: &str = "rovers";
const KNOWN_BLOCKS_CACHE_CAP: usize = 1024;
/// Depth the preemption rule in `on_peer_block` asks a peer to backfill.
const BACKWARD_SYNC_DEPTH: u64 = 7;

fn block_key(height: u64) -> String {
    format!("bc.block.{height}")
}

fn chain_latest_key(chain: ChainTag) -> String {
    format!("{chain}.block.latest")
}

/// Everything the engine needs to stand up: where its state lives, who it
/// mines as, and which external chains it waits to hear from before mining.
pub struct EngineInit {
    pub store: PersistentStorage,
    pub pubsub: Arc<PubSub>,
    pub clock: Arc<Clock>,
    pub peer: Option<Arc<dyn PeerRpc>>,
    pub worker_path: PathBuf,
    pub miner_key: String,
    pub known_rovers: Vec<ChainTag>,
}

pub struct Engine {
    store: PersistentStorage,
    pubsub: Arc<PubSub>,
    clock: Arc<Clock>,
    peer: Option<Arc<dyn PeerRpc>>,
    worker_path: PathBuf,
    miner_key: String,
    known_rovers: Vec<ChainTag>,

    multiverse: Multiverse,
    blockpool: blockpool::BlockPool,
    known_blocks_cache: LruCache<Hash, ParentBlock>,
    worker: Option<WorkerHandle>,

    can_mine: bool,
    peer_is_syncing: bool,
    peer_is_resyncing: bool,
    unfinished_block: Option<ParentBlock>,
    unfinished_block_data: Option<DifficultyData>,
    collected: HashMap<ChainTag, u64>,
}

impl Engine {
    pub fn new(init: EngineInit) -> Result<Self, EngineError> {
        let blockpool = blockpool::BlockPool::new(
            init.store.clone(),
            init.pubsub.clone(),
            consensus::GENESIS_HASH.to_string(),
        )?;
        Ok(Self {
            store: init.store,
            pubsub: init.pubsub,
            clock: init.clock,
            peer: init.peer,
            worker_path: init.worker_path,
            miner_key: init.miner_key,
            known_rovers: init.known_rovers,
            multiverse: Multiverse::new(),
            blockpool,
            known_blocks_cache: LruCache::new(KNOWN_BLOCKS_CACHE_CAP),
            worker: None,
            can_mine: false,
            peer_is_syncing: false,
            peer_is_resyncing: false,
            unfinished_block: None,
            unfinished_block_data: None,
            collected: HashMap::new(),
        })
    }

    /// Genesis bootstrap (spec scenario 1): if `bc.block.latest` is absent,
    /// write the hardcoded genesis at height 1 and as the latest tip.
    pub fn bootstrap(&mut self) -> Result<(), EngineError> {
        if self.store.get_typed::<ParentBlock>(LATEST_KEY)?.is_some() {
            return Ok(());
        }
        let genesis = consensus::genesis_block();
        self.store.put_typed(&block_key(genesis.height), &genesis)?;
        self.store.put_typed(LATEST_KEY, &genesis)?;
        self.store.put_typed(ROVERS_KEY, &self.known_rovers)?;
        self.multiverse.add(genesis, true);
        Ok(())
    }

    pub fn can_mine(&self) -> bool {
        self.can_mine
    }

    pub fn peer_is_syncing(&self) -> bool {
        self.peer_is_syncing
    }

    pub fn set_peer_is_syncing(&mut self, syncing: bool) {
        self.peer_is_syncing = syncing;
    }

    pub fn multiverse(&self) -> &Multiverse {
        &self.multiverse
    }

    /// Feeds one backward-sync response block into the block pool. A peer
    /// adapter drives this one block at a time while walking back towards
    /// genesis; `blockpool` itself publishes `state.checkpoint.end` /
    /// `state.resync.failed` when the walk concludes.
    pub fn add_backward_sync_block(&mut self, block: ParentBlock) -> Result<(), EngineError> {
        self.blockpool.add(block).map_err(EngineError::Persistence)
    }

    pub fn set_backward_sync_checkpoint(&mut self, checkpoint: ParentBlock) {
        self.blockpool.set_checkpoint(checkpoint);
    }

    pub fn backward_sync_earliest(&self) -> Option<&ParentBlock> {
        self.blockpool.earliest()
    }

    // -- §4.4 operations -----------------------------------------------

    pub async fn on_rover_tip(&mut self, tip: rover::RoverTip) -> Result<(), EngineError> {
        *self.collected.entry(tip.chain).or_insert(0) += 1;

        if !self.can_mine
            && self
                .known_rovers
                .iter()
                .all(|c| self.collected.get(c).copied().unwrap_or(0) >= 1)
        {
            self.can_mine = true;
        }

        let active: BTreeSet<ChainTag> = self.collected.keys().copied().collect();
        let known: BTreeSet<ChainTag> = self.known_rovers.iter().copied().collect();
        if !self.can_mine || self.peer_is_syncing || active != known {
            return Ok(());
        }

        self.start_mining(tip.header).await
    }

    pub async fn start_mining(&mut self, trigger_child: ChildHeader) -> Result<(), EngineError> {
        let last_parent: ParentBlock = self
            .store
            .get_typed(LATEST_KEY)?
            .ok_or_else(|| EngineError::Fatal("bc.block.latest is unset".to_string()))?;

        let mut current_child_tips = ChildHeaderMap::new();
        for chain in self.known_rovers.clone() {
            if let Some(header) = self.store.get_typed::<ChildHeader>(&chain_latest_key(chain))? {
                current_child_tips.insert(header);
            }
        }

        if let Some(unfinished) = &self.unfinished_block {
            if consensus::should_drop_unfinished(unfinished) {
                self.unfinished_block = None;
                self.unfinished_block_data = None;
            }
        }

        let now_s = self.clock.now_s();
        let (mut candidate, final_ts) = consensus::prepare_new_block(
            now_s,
            &last_parent,
            &current_child_tips,
            &trigger_child,
            vec![],
            &self.miner_key,
            self.unfinished_block.as_ref(),
        );
        candidate.timestamp_s = final_ts;

        let work = consensus::prepare_work(&last_parent.hash, &candidate.blockchain_headers);
        let difficulty_data = DifficultyData {
            current_timestamp_s: final_ts,
            prev_block_bytes: serde_json::to_string(&last_parent)
                .map_err(|e| EngineError::Worker(e.to_string()))?,
            new_headers_bytes: serde_json::to_string(&candidate.blockchain_headers)
                .map_err(|e| EngineError::Worker(e.to_string()))?,
        };

        self.unfinished_block = Some(candidate.clone());
        self.unfinished_block_data = Some(difficulty_data.clone());

        if self.worker.is_some() {
            self.restart_mining().await;
        }

        let mut handle = WorkerHandle::spawn(&self.worker_path)
            .await
            .map_err(|e| EngineError::Worker(e.to_string()))?;
        let request = WorkRequest {
            current_timestamp_s: final_ts,
            offset_ms: self.clock.offset_ms(),
            work,
            miner_key: self.miner_key.clone(),
            merkle_root: candidate.merkle_root.clone(),
            difficulty: candidate.difficulty.clone(),
            difficulty_data,
        };
        handle
            .send(&request)
            .await
            .map_err(|e| EngineError::Worker(e.to_string()))?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Stop the current worker; the next `start_mining` call assembles and
    /// sends a fresh candidate rather than resuming the old one.
    pub async fn restart_mining(&mut self) {
        self.stop_mining().await;
    }

    /// Idempotent; returns whether a worker was actually running.
    pub async fn stop_mining(&mut self) -> bool {
        match self.worker.take() {
            Some(mut handle) => {
                if let Err(e) = handle.stop().await {
                    warn!(error = %e, "stop_mining: failed to signal worker, dropping handle anyway");
                }
                true
            }
            None => false,
        }
    }

    /// Never resolves while no worker is running, so callers can select over
    /// it alongside other event sources without a busy loop. A silent exit
    /// (the worker's own 300s deadline) and a crash both clear
    /// `unfinished_block` and release the handle without auto-restarting;
    /// the next rover tip attempts a fresh mine.
    pub async fn wait_for_solution(&mut self) -> Option<anyhow::Result<miner::WorkSolution>> {
        let Some(handle) = self.worker.as_mut() else {
            return std::future::pending().await;
        };
        match handle.recv_solution().await {
            Ok(Some(solution)) => Some(Ok(solution)),
            Ok(None) => {
                self.worker = None;
                self.unfinished_block = None;
                self.unfinished_block_data = None;
                None
            }
            Err(e) => {
                self.worker = None;
                self.unfinished_block = None;
                self.unfinished_block_data = None;
                Some(Err(e))
            }
        }
    }

    pub async fn on_worker_solution(
        &mut self,
        solution: miner::WorkSolution,
    ) -> Result<(), EngineError> {
        let Some(mut candidate) = self.unfinished_block.clone() else {
            warn!("on_worker_solution: no unfinished block, dropping solution");
            return Ok(());
        };

        let prev_total_distance = candidate.total_distance.clone();
        candidate.nonce = solution.nonce;
        candidate.distance = solution.distance.clone();
        candidate.timestamp_s = solution.timestamp_s;
        candidate.difficulty = solution.difficulty;
        candidate.total_distance = BigIntHex(prev_total_distance.0 + solution.distance.0);
        candidate.hash = consensus::block_hash(&candidate.previous_hash, &candidate.merkle_root);

        let prev: Option<ParentBlock> = self.store.get_typed(LATEST_KEY)?;
        let valid = prev
            .as_ref()
            .is_some_and(|prev| consensus::is_valid_block(&candidate, prev));
        if !valid {
            warn!(height = candidate.height, "mined block failed validation, dropping");
            self.unfinished_block = None;
            self.unfinished_block_data = None;
            self.worker = None;
            return Ok(());
        }

        match self.process_mined_block(candidate.clone()) {
            Ok(()) => {
                self.pubsub
                    .publish(topics::UPDATE_BLOCK_LATEST, &BlockEvent::new(candidate.clone()));
                self.pubsub.publish(topics::BLOCK_MINED, &BlockEvent::new(candidate));
                self.unfinished_block = None;
                self.unfinished_block_data = None;
                self.worker = None;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to persist mined block");
                self.unfinished_block = None;
                self.unfinished_block_data = None;
                self.worker = None;
                Err(e)
            }
        }
    }

    fn process_mined_block(&mut self, block: ParentBlock) -> Result<(), EngineError> {
        self.multiverse.add(block.clone(), true);
        self.store.put_typed(&block_key(block.height), &block)?;
        self.store.put_typed(LATEST_KEY, &block)?;
        Ok(())
    }

    pub async fn on_peer_block(&mut self, new_block: ParentBlock) -> Result<(), EngineError> {
        if self.known_blocks_cache.contains(&new_block.hash) {
            return Ok(());
        }
        self.known_blocks_cache
            .put(new_block.hash.clone(), new_block.clone());

        let before_hash = self.multiverse.highest_default().map(|b| b.hash.clone());
        let _added = self.multiverse.add(new_block.clone(), false);
        let after = self.multiverse.highest_default().cloned();
        let after_hash = after.as_ref().map(|b| b.hash.clone());

        if before_hash != after_hash {
            self.stop_mining().await;
            self.pubsub
                .publish(topics::UPDATE_BLOCK_LATEST, &BlockEvent::new(new_block));
            return Ok(());
        }

        let dominates = after
            .as_ref()
            .is_some_and(|a| a.height < new_block.height && a.total_distance.0 < new_block.total_distance.0);
        if !dominates {
            return Ok(());
        }

        self.pubsub.publish(
            topics::UPDATE_BLOCK_LATEST,
            &BlockEvent::new(new_block.clone()).forced(),
        );
        self.stop_mining().await;

        let Some(peer) = self.peer.clone() else {
            return Ok(());
        };
        let low = new_block.height.saturating_sub(BACKWARD_SYNC_DEPTH).max(1);
        let high = new_block.height.saturating_sub(1);
        let request = QueryRequest {
            query_hash: new_block.hash.clone(),
            query_height: new_block.height,
            low,
            high,
        };
        let mut fetched = peer
            .query(request)
            .await
            .map_err(|e| EngineError::Protocol(e.to_string()))?;
        fetched.sort_by(|a, b| b.height.cmp(&a.height));

        if fetched.len() <= 6 {
            return Ok(());
        }
        let Some(candidate_highest) = fetched.first().cloned() else {
            return Ok(());
        };
        let dominates_current = after.as_ref().map_or(true, |a| {
            candidate_highest.total_distance.0 > a.total_distance.0
                && candidate_highest.height > a.height
        });
        if !dominates_current {
            return Ok(());
        }
        for block in fetched.iter().rev() {
            self.multiverse.add(block.clone(), true);
        }
        self.multiverse.add(new_block, true);
        if let Some(lowest) = fetched.last() {
            self.blockpool.set_checkpoint(lowest.clone());
        }
        Ok(())
    }

    // -- §4.4 pub/sub dispatch ------------------------------------------

    pub fn on_pubsub(&mut self, topic: &str, event: &BlockEvent) -> Result<(), EngineError> {
        match topic {
            topics::STATE_BLOCK_HEIGHT => self.store_height(event),
            topics::UPDATE_BLOCK_LATEST => {
                self.update_latest_and_store(event);
                Ok(())
            }
            topics::STATE_RESYNC_FAILED => {
                self.peer_is_resyncing = true;
                self.blockpool.purge(event.data.clone())?;
                Ok(())
            }
            topics::STATE_CHECKPOINT_END => {
                self.peer_is_resyncing = false;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn store_height(&self, event: &BlockEvent) -> Result<(), EngineError> {
        let block = &event.data;
        if block.height < 2 {
            return Ok(());
        }
        if event.force {
            self.store.put_typed(&block_key(block.height), block)?;
            return Ok(());
        }
        let prev: Option<ParentBlock> = self.store.get_typed(&block_key(block.height - 1))?;
        let linked = prev
            .as_ref()
            .is_some_and(|p| p.hash == block.previous_hash && p.total_distance.0 < block.total_distance.0);
        if !linked {
            warn!(height = block.height, "storing orphan block");
        }
        self.store.put_typed(&block_key(block.height), block)?;
        Ok(())
    }

    fn update_latest_and_store(&mut self, event: &BlockEvent) {
        let block = &event.data;
        let result: anyhow::Result<()> = (|| {
            let prev_latest: Option<ParentBlock> = self.store.get_typed(LATEST_KEY)?;
            let persist = event.force
                || prev_latest
                    .as_ref()
                    .is_some_and(|p| p.hash == block.previous_hash);
            let fresh = prev_latest
                .as_ref()
                .map_or(true, |p| block.timestamp_s >= p.timestamp_s);
            if persist && fresh {
                self.store.put_typed(LATEST_KEY, block)?;
                self.store.put_typed(&block_key(block.height), block)?;
            }
            Ok(())
        })();
        if let Err(e) = result {
            warn!(error = %e, "update_latest_and_store: best-effort write failed");
        }

        if !event.force {
            return;
        }
        let mut stack = event.multiverse.clone();
        while let Some(block) = stack.pop() {
            if let Err(e) = self.store.put_typed(&block_key(block.height), &block) {
                warn!(error = %e, "update_latest_and_store: draining forced multiverse write failed");
            }
        }
        if let Some(purge_to) = event.purge {
            if let Err(e) = self.blockpool.purge_from(block.height, purge_to) {
                warn!(error = %e, "update_latest_and_store: purge_from failed");
            }
        }
    }
}
