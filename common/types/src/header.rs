use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chain::ChainTag;
use crate::Hash;

/// The most recently observed tip of an external chain, as bundled inside a
/// `ParentBlock`. Immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildHeader {
    pub chain: ChainTag,
    pub hash: Hash,
    pub previous_hash: Hash,
    pub timestamp_ms: u64,
    pub height: u64,
    pub merkle_root: Hash,
    /// Number of confirmations this tip had on its own chain, >= 1.
    pub confirmations_in_parent: u32,
}

/// A mapping from chain tag to an ordered list of `ChildHeader`, most recent
/// first. Invariant: every known chain tag has at least one entry in a valid
/// `ParentBlock`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildHeaderMap(pub BTreeMap<ChainTag, Vec<ChildHeader>>);

impl ChildHeaderMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, header: ChildHeader) {
        let list = self.0.entry(header.chain).or_default();
        list.insert(0, header);
    }

    pub fn latest(&self, chain: ChainTag) -> Option<&ChildHeader> {
        self.0.get(&chain).and_then(|list| list.first())
    }

    pub fn is_complete(&self, known: &[ChainTag]) -> bool {
        known
            .iter()
            .all(|chain| self.0.get(chain).is_some_and(|list| !list.is_empty()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChainTag, &Vec<ChildHeader>)> {
        self.0.iter()
    }

    /// All headers across all chains, used for merkle rooting and the
    /// header-hash-set equality checks in the multiverse.
    pub fn all_headers(&self) -> impl Iterator<Item = &ChildHeader> {
        self.0.values().flatten()
    }

    /// The distinct set of header hashes across all chains, used to detect
    /// duplicate mining context (`has_parent`/`has_child` in the multiverse).
    pub fn header_hash_set(&self) -> std::collections::BTreeSet<&str> {
        self.all_headers().map(|h| h.hash.as_str()).collect()
    }

    /// Count of distinct child blocks referenced, used by the unfinished-block
    /// cleanup rule in `start_mining` (>= 6 distinct child blocks => drop).
    pub fn distinct_child_count(&self) -> usize {
        self.all_headers()
            .map(|h| h.hash.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn header(chain: ChainTag, hash: &str) -> ChildHeader {
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

    #[test]
    fn is_complete_requires_every_known_chain() {
        let mut map = ChildHeaderMap::new();
        map.insert(header(ChainTag::Btc, "a"));
        assert!(!map.is_complete(&[ChainTag::Btc, ChainTag::Eth]));
        map.insert(header(ChainTag::Eth, "b"));
        assert!(map.is_complete(&[ChainTag::Btc, ChainTag::Eth]));
    }

    #[test]
    fn insert_keeps_most_recent_first() {
        let mut map = ChildHeaderMap::new();
        map.insert(header(ChainTag::Btc, "old"));
        map.insert(header(ChainTag::Btc, "new"));
        assert_eq!(map.latest(ChainTag::Btc).unwrap().hash, "new");
    }
}
