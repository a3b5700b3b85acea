//! Height-indexed fork graph with the fork-choice rule described for the
//! node's canonical-history view.

use std::collections::BTreeMap;

use num_bigint::BigInt;
use types::ParentBlock;

/// Below this many populated heights, `add` treats the multiverse as still
/// syncing and accepts blocks it would otherwise reject, unless `selective`
/// is set.
const SYNCING_HEIGHT_THRESHOLD: usize = 7;

const DEFAULT_HIGHEST_DEPTH: usize = 7;

#[derive(Default)]
pub struct Multiverse {
    blocks: BTreeMap<u64, Vec<ParentBlock>>,
    selective: bool,
}

impl Multiverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, `add` never falls back to treat-as-syncing regardless of how
    /// few heights are populated.
    pub fn set_selective(&mut self, selective: bool) {
        self.selective = selective;
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn at_height(&self, height: u64) -> &[ParentBlock] {
        self.blocks.get(&height).map(Vec::as_slice).unwrap_or(&[])
    }

    fn has_parent(&self, block: &ParentBlock) -> bool {
        let Some(h) = block.height.checked_sub(1) else {
            return false;
        };
        self.blocks.get(&h).is_some_and(|parents| {
            parents.iter().any(|p| {
                p.hash == block.previous_hash
                    && p.height == h
                    && p.header_hash_set() != block.header_hash_set()
            })
        })
    }

    fn has_child(&self, block: &ParentBlock) -> bool {
        let h = block.height + 1;
        self.blocks.get(&h).is_some_and(|children| {
            children.iter().any(|c| {
                c.previous_hash == block.hash
                    && c.height == h
                    && c.header_hash_set() != block.header_hash_set()
            })
        })
    }

    fn already_present(&self, block: &ParentBlock) -> bool {
        self.blocks
            .get(&block.height)
            .is_some_and(|list| list.iter().any(|b| b.hash == block.hash))
    }

    fn insert_sorted(&mut self, block: ParentBlock) {
        let list = self.blocks.entry(block.height).or_default();
        list.push(block);
        list.sort_by(|a, b| b.total_distance.0.cmp(&a.total_distance.0));
    }

    /// Returns whether the block was accepted.
    pub fn add(&mut self, block: ParentBlock, force: bool) -> bool {
        let syncing = self.blocks.len() < SYNCING_HEIGHT_THRESHOLD && !self.selective;
        let force = force || syncing;

        if self.has_parent(&block) || self.has_child(&block) {
            if !self.already_present(&block) {
                self.insert_sorted(block);
            }
            return true;
        }

        if force {
            self.insert_sorted(block);
            return true;
        }

        false
    }

    /// The single block at the smallest populated height, heaviest first.
    pub fn lowest(&self) -> Option<&ParentBlock> {
        self.blocks.values().next().and_then(|list| list.first())
    }

    /// Walks every chain of contiguous-by-hash blocks, picks the longest that
    /// clears `depth` with the greatest accumulated `total_distance`, and
    /// falls back to the heaviest chain of any length if none clears it.
    pub fn highest(&self, depth: usize) -> Option<&ParentBlock> {
        if self.blocks.is_empty() {
            return None;
        }

        let heights: Vec<u64> = self.blocks.keys().copied().collect();
        let mut chain_info: BTreeMap<u64, Vec<(usize, BigInt)>> = BTreeMap::new();

        for &h in &heights {
            let list = &self.blocks[&h];
            let mut infos = Vec::with_capacity(list.len());
            for block in list {
                let mut best: Option<(usize, BigInt)> = None;
                if let Some(prev_height) = h.checked_sub(1) {
                    if let (Some(prev_list), Some(prev_infos)) =
                        (self.blocks.get(&prev_height), chain_info.get(&prev_height))
                    {
                        for (parent, (plen, psum)) in prev_list.iter().zip(prev_infos.iter()) {
                            if parent.hash == block.previous_hash {
                                let candidate =
                                    (plen + 1, psum.clone() + block.total_distance.0.clone());
                                if best.as_ref().map_or(true, |b| candidate.0 > b.0) {
                                    best = Some(candidate);
                                }
                            }
                        }
                    }
                }
                infos.push(best.unwrap_or_else(|| (1, block.total_distance.0.clone())));
            }
            chain_info.insert(h, infos);
        }

        let mut eligible_best: Option<(&ParentBlock, &BigInt)> = None;
        let mut fallback_best: Option<(&ParentBlock, &BigInt)> = None;

        for &h in &heights {
            let list = &self.blocks[&h];
            let infos = &chain_info[&h];
            for (block, (len, sum)) in list.iter().zip(infos.iter()) {
                if fallback_best.map_or(true, |(_, s)| sum > s) {
                    fallback_best = Some((block, sum));
                }
                if *len >= depth && eligible_best.map_or(true, |(_, s)| sum > s) {
                    eligible_best = Some((block, sum));
                }
            }
        }

        eligible_best.or(fallback_best).map(|(block, _)| block)
    }

    pub fn highest_default(&self) -> Option<&ParentBlock> {
        self.highest(DEFAULT_HIGHEST_DEPTH)
    }
}

#[cfg(test)]
mod test {
    use types::{ChildHeaderMap, GenesisParams};

    use super::*;

    fn block(height: u64, hash: &str, previous_hash: &str, total_distance: u64) -> ParentBlock {
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
            distance: types::BigIntHex::from_u64(total_distance),
            total_distance: types::BigIntHex::from_u64(total_distance),
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

    #[test]
    fn sparse_multiverse_accepts_everything_while_syncing() {
        let mut mv = Multiverse::new();
        assert!(mv.add(block(1, "a", "genesis", 10), false));
        assert!(mv.add(block(5, "b", "unrelated", 50), false));
    }

    #[test]
    fn fork_choice_picks_heavier_sibling() {
        let mut mv = Multiverse::new();
        mv.set_selective(true);
        for h in 1..8 {
            mv.add(block(h, &format!("c{h}"), &format!("c{}", h - 1), h * 10), true);
        }
        let light = block(8, "light", "c7", 71);
        let heavy = block(8, "heavy", "c7", 200);
        mv.add(light, true);
        mv.add(heavy.clone(), true);
        assert_eq!(mv.at_height(8)[0].hash, heavy.hash);
    }

    #[test]
    fn lowest_returns_smallest_height() {
        let mut mv = Multiverse::new();
        mv.add(block(3, "x", "p", 30), true);
        mv.add(block(1, "y", "p", 10), true);
        assert_eq!(mv.lowest().unwrap().height, 1);
    }

    #[test]
    fn empty_multiverse_has_no_highest() {
        let mv = Multiverse::new();
        assert!(mv.highest(7).is_none());
    }
}
