//! Difficulty, work, and distance: the pure functions the engine calls when
//! assembling a mining candidate and the worker calls to re-check its target.

use num_bigint::BigInt;
use types::BigIntHex;

/// Floor below which `get_diff` never returns, regardless of elapsed time.
pub const MINIMUM_DIFFICULTY_HEX: &str = "0x11801972029393";

pub fn minimum_difficulty() -> BigIntHex {
    BigIntHex::from_hex(MINIMUM_DIFFICULTY_HEX).expect("constant is valid hex")
}

/// `elapsed` and `prev_ts` share a unit (milliseconds, per the clock).
pub fn get_diff(
    now: i64,
    prev_ts: i64,
    prev_distance: &BigIntHex,
    min_diff: &BigIntHex,
    new_block_count: i64,
) -> BigIntHex {
    let mut elapsed = now - prev_ts;
    let bonus = elapsed + (elapsed - 4) * new_block_count;
    if bonus > 0 {
        elapsed = bonus;
    }
    let mut x = 1 - (elapsed as f64 / 6.0).floor() as i64;
    if x < -99 {
        x = -99;
    }
    let y = &prev_distance.0 / 148;
    let result = &prev_distance.0 + BigInt::from(x) * y;
    if result > min_diff.0 {
        BigIntHex(result)
    } else {
        min_diff.clone()
    }
}

/// Adds an exponential bonus every 66 million blocks past the second such
/// period, keeping difficulty climbing even if `get_diff` alone stalls.
pub fn get_exp_factor_diff(diff: &BigIntHex, parent_height: u64) -> BigIntHex {
    let period = (parent_height + 1) / 66_000_000;
    if period > 2 {
        BigIntHex(&diff.0 + (BigInt::from(1) << (period - 2)))
    } else {
        diff.clone()
    }
}

/// Left folds `H(acc || item)`; a single item therefore yields `H(item)`
/// since the fold seed is the empty string.
pub fn merkle_root(items: &[String]) -> String {
    items
        .iter()
        .fold(String::new(), |acc, item| hashing::h2(acc.as_bytes(), item.as_bytes()))
}

/// XOR-reduce of `H(header.hash || header.merkle_root)` across every header,
/// as an unbounded integer so `prepare_work` can mix it against the previous
/// block's hash.
pub fn child_chain_root(headers: &types::ChildHeaderMap) -> BigInt {
    headers.all_headers().fold(BigInt::from(0), |acc, header| {
        let digest = hashing::h2(header.hash.as_bytes(), header.merkle_root.as_bytes());
        acc ^ BigInt::parse_bytes(digest.as_bytes(), 16).unwrap_or_default()
    })
}

pub fn prepare_work(prev_hash: &str, headers: &types::ChildHeaderMap) -> String {
    let prev_int =
        BigInt::parse_bytes(prev_hash.trim_start_matches("0x").as_bytes(), 16).unwrap_or_default();
    let root = child_chain_root(headers) ^ prev_int;
    hashing::h(root.to_string().as_bytes())
}

fn ascii_chunks(s: &str, reversed: bool) -> Vec<Vec<i64>> {
    let mut chunks: Vec<Vec<i64>> = s
        .bytes()
        .collect::<Vec<u8>>()
        .chunks(32)
        .map(|chunk| chunk.iter().map(|&b| b as i64).collect())
        .collect();
    if reversed {
        chunks.reverse();
    }
    chunks
}

fn cosine_similarity(a: &[i64], b: &[i64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let dot: f64 = a[..n]
        .iter()
        .zip(&b[..n])
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let norm_a: f64 = a[..n].iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b[..n].iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// `a`'s chunk list is taken back-to-front, `b`'s front-to-back; each chunk's
/// own bytes stay in their original order, so a single-chunk string (the
/// common case, hash values) compares identically against itself regardless
/// of orientation. Unequal chunk counts pair up by `zip`, so the shorter side
/// determines how many chunks contribute to the sum.
pub fn distance(a: &str, b: &str) -> BigInt {
    let chunks_a = ascii_chunks(a, true);
    let chunks_b = ascii_chunks(b, false);
    let sum: f64 = chunks_a
        .iter()
        .zip(chunks_b.iter())
        .map(|(ca, cb)| 1.0 - cosine_similarity(ca, cb))
        .sum();
    BigInt::from((sum * 1e15).floor() as i128)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn get_diff_zero_elapsed_returns_prev_distance() {
        let prev_distance = BigIntHex::from_u64(10_000_000);
        let min = minimum_difficulty();
        let d = get_diff(6, 0, &prev_distance, &min, 0);
        assert_eq!(d, prev_distance);
    }

    #[test]
    fn get_diff_clamps_to_minimum() {
        let prev_distance = BigIntHex::from_u64(1);
        let min = minimum_difficulty();
        let d = get_diff(100_000_000, 0, &prev_distance, &min, 0);
        assert_eq!(d, min);
    }

    #[test]
    fn exp_factor_noop_below_period_three() {
        let diff = BigIntHex::from_u64(1000);
        assert_eq!(get_exp_factor_diff(&diff, 1000), diff);
    }

    #[test]
    fn exp_factor_adds_bonus_past_period_two() {
        let diff = BigIntHex::from_u64(1000);
        let bumped = get_exp_factor_diff(&diff, 66_000_000 * 3);
        assert!(bumped.0 > diff.0);
    }

    #[test]
    fn merkle_root_single_item_matches_plain_hash() {
        let items = vec!["only".to_string()];
        assert_eq!(merkle_root(&items), hashing::h("only"));
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance("some-hash-value", "some-hash-value"), BigInt::from(0));
    }

    #[test]
    fn distance_is_deterministic() {
        assert_eq!(distance("abc", "def"), distance("abc", "def"));
    }
}
