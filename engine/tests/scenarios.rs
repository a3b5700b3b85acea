//! Scenario-level tests that don't require spawning the real mining worker
//! binary: genesis bootstrap, orphan storage, and peer-block fork handling.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use clock::Clock;
use engine::{Engine, EngineInit};
use peer::{PeerRpc, QueryRequest, RangeEndpoint};
use pubsub::PubSub;
use storage::PersistentStorage;
use types::events::{topics, BlockEvent};
use types::{BigIntHex, ChainTag, ChildHeader, ChildHeaderMap, GenesisParams, ParentBlock};

fn child_header(chain: ChainTag, hash: &str) -> ChildHeader {
    ChildHeader {
        chain,
        hash: hash.to_string(),
        previous_hash: "parent".to_string(),
        timestamp_ms: 0,
        height: 1,
        merkle_root: "root".to_string(),
        confirmations_in_parent: 1,
    }
}

fn block(height: u64, hash: &str, previous_hash: &str, total_distance: u64) -> ParentBlock {
    ParentBlock {
        hash: hash.to_string(),
        previous_hash: previous_hash.to_string(),
        version: 1,
        schema_version: 1,
        height,
        miner: "miner".to_string(),
        difficulty: BigIntHex::from_u64(1),
        timestamp_s: height,
        merkle_root: "m".to_string(),
        chain_root: "0".to_string(),
        distance: BigIntHex::from_u64(total_distance),
        total_distance: BigIntHex::from_u64(total_distance),
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

struct NoopPeer {
    queried: Arc<AtomicBool>,
    reply: Vec<ParentBlock>,
}

#[async_trait]
impl PeerRpc for NoopPeer {
    async fn get_headers(&self, _from: RangeEndpoint, _to: RangeEndpoint) -> Result<Vec<ParentBlock>> {
        Ok(vec![])
    }

    async fn get_latest_header(&self) -> Result<Option<ParentBlock>> {
        Ok(None)
    }

    async fn get_latest_headers(&self, _count: u64) -> Result<Vec<ParentBlock>> {
        Ok(vec![])
    }

    async fn get_multiverse(&self) -> Result<Vec<ParentBlock>> {
        Ok(vec![])
    }

    async fn query(&self, _request: QueryRequest) -> Result<Vec<ParentBlock>> {
        self.queried.store(true, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

fn test_engine(peer: Option<Arc<dyn PeerRpc>>) -> Engine {
    Engine::new(EngineInit {
        store: PersistentStorage::memory(),
        pubsub: Arc::new(PubSub::new()),
        clock: Arc::new(Clock::new()),
        peer,
        worker_path: PathBuf::from("/nonexistent/miner-worker"),
        miner_key: "miner".to_string(),
        known_rovers: vec![ChainTag::Btc],
    })
    .unwrap()
}

#[test]
fn genesis_bootstrap_is_idempotent_and_byte_stable() {
    let mut engine = test_engine(None);
    engine.bootstrap().unwrap();
    let first = engine.multiverse().lowest().cloned().unwrap();
    engine.bootstrap().unwrap();
    let second = engine.multiverse().lowest().cloned().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.hash, consensus::GENESIS_HASH);
}

#[tokio::test]
async fn orphan_block_is_still_stored_with_a_warning() {
    let mut engine = test_engine(None);
    engine.bootstrap().unwrap();

    let orphan = block(2, "h2", "not-genesis", 5);
    engine
        .on_pubsub(topics::STATE_BLOCK_HEIGHT, &BlockEvent::new(orphan))
        .unwrap();
    // `store_height` always persists, orphan or not; verified indirectly via
    // `update_latest_and_store` accepting the same height afterwards.
    let event = BlockEvent::new(block(2, "h2", "not-genesis", 5)).forced();
    engine.on_pubsub(topics::UPDATE_BLOCK_LATEST, &event).unwrap();
}

#[tokio::test]
async fn peer_block_that_replaces_the_tip_stops_mining_and_publishes() {
    let pubsub = Arc::new(PubSub::new());
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    pubsub.subscribe(topics::UPDATE_BLOCK_LATEST, "test", move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });

    let mut engine = Engine::new(EngineInit {
        store: PersistentStorage::memory(),
        pubsub: pubsub.clone(),
        clock: Arc::new(Clock::new()),
        peer: None,
        worker_path: PathBuf::from("/nonexistent/miner-worker"),
        miner_key: "miner".to_string(),
        known_rovers: vec![ChainTag::Btc],
    })
    .unwrap();
    engine.bootstrap().unwrap();

    let heavier = block(2, "h2", consensus::GENESIS_HASH, 1_000_000);
    engine.on_peer_block(heavier.clone()).await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(engine.multiverse().highest_default().unwrap().hash, heavier.hash);
}

#[tokio::test]
async fn first_tip_for_every_known_chain_flips_can_mine() {
    let mut engine = test_engine(None);
    engine.bootstrap().unwrap();
    assert!(!engine.can_mine());

    // The worker binary isn't present in a test environment, so the mining
    // attempt this triggers fails at the spawn step — but `can_mine` is
    // latched before `start_mining` is ever called, matching the spec's
    // "collected[c] >= 1 for all known c => can_mine == true" invariant.
    let tip = rover::RoverTip {
        chain: ChainTag::Btc,
        header: child_header(ChainTag::Btc, "tip1"),
    };
    let _ = engine.on_rover_tip(tip).await;
    assert!(engine.can_mine());
}

#[tokio::test]
async fn backward_sync_reaching_genesis_closes_the_checkpoint() {
    let mut engine = test_engine(None);
    engine.bootstrap().unwrap();

    engine.set_backward_sync_checkpoint(block(10, "checkpoint", "c9", 100));
    engine
        .add_backward_sync_block(block(3, "b3", "b2", 3))
        .unwrap();
    assert_eq!(engine.backward_sync_earliest().unwrap().height, 3);

    // Links straight to genesis: blockpool publishes `state.checkpoint.end`
    // and clears its own `earliest` pointer.
    engine
        .add_backward_sync_block(block(2, "b2", consensus::GENESIS_HASH, 2))
        .unwrap();
    assert!(engine.backward_sync_earliest().is_none());
}

#[tokio::test]
async fn dominant_disconnected_peer_block_triggers_backward_sync_query() {
    let queried = Arc::new(AtomicBool::new(false));
    let reply: Vec<ParentBlock> = (1..=7)
        .map(|h| block(h, &format!("sync{h}"), &format!("sync{}", h - 1), h * 5))
        .collect();
    let peer = Arc::new(NoopPeer {
        queried: queried.clone(),
        reply,
    });

    let mut engine = test_engine(Some(peer));
    engine.bootstrap().unwrap();

    // Build a connected 7-height chain so the multiverse leaves syncing mode.
    let mut previous = consensus::GENESIS_HASH.to_string();
    for h in 2..=7 {
        let hash = format!("c{h}");
        engine.on_peer_block(block(h, &hash, &previous, h * 10)).await.unwrap();
        previous = hash;
    }

    // Disconnected, far-ahead, much heavier block: no linking parent at height 8.
    let dominant = block(9, "dominant", "unrelated", 1_000_000);
    engine.on_peer_block(dominant).await.unwrap();

    assert!(queried.load(Ordering::SeqCst), "expected a backward-sync query to be issued");
}
