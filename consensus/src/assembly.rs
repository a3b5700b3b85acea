//! `prepare_new_block`: assembles a mining candidate from the last parent and
//! the current set of external-chain tips, retrying with an advancing
//! timestamp until the difficulty narrows to 53 bits.

use types::{ChildHeader, ChildHeaderMap, ParentBlock};

use crate::work::{get_diff, get_exp_factor_diff, merkle_root, minimum_difficulty};

/// Drops an in-progress candidate once it references six or more distinct
/// child blocks, per the unfinished-block cleanup rule.
pub const UNFINISHED_BLOCK_HEADER_LIMIT: usize = 6;

pub fn should_drop_unfinished(unfinished: &ParentBlock) -> bool {
    unfinished.blockchain_headers.distinct_child_count() >= UNFINISHED_BLOCK_HEADER_LIMIT
}

pub fn prepare_new_block(
    now_s: u64,
    last_parent: &ParentBlock,
    current_child_tips: &ChildHeaderMap,
    trigger_child: &ChildHeader,
    tx_list: Vec<String>,
    miner_key: &str,
    unfinished_block: Option<&ParentBlock>,
) -> (ParentBlock, u64) {
    let mut headers = current_child_tips.clone();
    headers.insert(trigger_child.clone());
    if let Some(unfinished) = unfinished_block {
        if !should_drop_unfinished(unfinished) {
            for header in unfinished.blockchain_headers.all_headers() {
                headers.insert(header.clone());
            }
        }
    }

    let min_diff = minimum_difficulty();
    let mut timestamp_s = now_s.max(last_parent.timestamp_s);

    loop {
        let new_block_count = headers.distinct_child_count() as i64;
        let diff = get_diff(
            (timestamp_s * 1000) as i64,
            (last_parent.timestamp_s * 1000) as i64,
            &last_parent.distance,
            &min_diff,
            new_block_count,
        );
        let diff = get_exp_factor_diff(&diff, last_parent.height);

        if diff.fits_53_bits() {
            let merkle_items: Vec<String> = if tx_list.is_empty() {
                headers.all_headers().map(|h| h.hash.clone()).collect()
            } else {
                tx_list.clone()
            };
            let merkle = merkle_root(&merkle_items);
            let chain_root = crate::work::child_chain_root(&headers).to_str_radix(16);

            let candidate = ParentBlock {
                hash: String::new(),
                previous_hash: last_parent.hash.clone(),
                version: last_parent.version,
                schema_version: last_parent.schema_version,
                height: last_parent.height + 1,
                miner: miner_key.to_string(),
                difficulty: diff,
                timestamp_s,
                merkle_root: merkle,
                chain_root,
                distance: types::BigIntHex::zero(),
                total_distance: last_parent.total_distance.clone(),
                nonce: String::new(),
                nrg_grant: last_parent.nrg_grant,
                genesis: last_parent.genesis.clone(),
                tx_list,
                tx_count: 0,
                blockchain_headers_count: headers.distinct_child_count() as u32,
                blockchain_headers: headers,
                blockchain_fingerprints_root: String::new(),
            };
            return (candidate, timestamp_s);
        }

        timestamp_s += 1;
    }
}

#[cfg(test)]
mod test {
    use types::{ChainTag, GenesisParams};

    use super::*;

    fn header(chain: ChainTag, hash: &str) -> ChildHeader {
        ChildHeader {
            chain,
            hash: hash.to_string(),
            previous_hash: "prev".to_string(),
            timestamp_ms: 0,
            height: 1,
            merkle_root: "root".to_string(),
            confirmations_in_parent: 1,
        }
    }

    fn genesis_parent() -> ParentBlock {
        ParentBlock {
            hash: "genesis".to_string(),
            previous_hash: String::new(),
            version: 1,
            schema_version: 1,
            height: 1,
            miner: "miner".to_string(),
            difficulty: minimum_difficulty(),
            timestamp_s: 0,
            merkle_root: "genesis-merkle".to_string(),
            chain_root: "0".to_string(),
            distance: types::BigIntHex::zero(),
            total_distance: types::BigIntHex::zero(),
            nonce: String::new(),
            nrg_grant: 0,
            genesis: GenesisParams {
                emblem: "emblem".to_string(),
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
    fn height_and_previous_hash_follow_parent() {
        let parent = genesis_parent();
        let trigger = header(ChainTag::Btc, "tip");
        let (candidate, _) =
            prepare_new_block(100, &parent, &ChildHeaderMap::new(), &trigger, vec![], "miner", None);
        assert_eq!(candidate.height, parent.height + 1);
        assert_eq!(candidate.previous_hash, parent.hash);
        assert_eq!(candidate.distance, types::BigIntHex::zero());
    }

    #[test]
    fn candidate_difficulty_fits_53_bits() {
        let parent = genesis_parent();
        let trigger = header(ChainTag::Eth, "tip");
        let (candidate, _) =
            prepare_new_block(100, &parent, &ChildHeaderMap::new(), &trigger, vec![], "miner", None);
        assert!(candidate.difficulty.fits_53_bits());
    }

    #[test]
    fn six_distinct_headers_drop_unfinished() {
        let mut unfinished = genesis_parent();
        for i in 0..6 {
            unfinished
                .blockchain_headers
                .insert(header(ChainTag::Btc, &format!("h{i}")));
        }
        assert!(should_drop_unfinished(&unfinished));
    }
}
