//! The opaque hashing primitive `H(x)` referenced throughout the spec: a
//! Blake2 variant producing hex output. Grounded on
//! `examples/tari-project-tari/hashing` (`blake2 = "0.10"`), the only
//! Blake2 dependency anywhere in the example pack — the node's own `crypto`
//! crate only carries SHA-2/SHA-3/k256 for account signatures, which this
//! core has no use for.

use blake2::digest::Digest;
use blake2::Blake2s256;

/// `H(x)`: hashes raw bytes, returns lowercase hex.
pub fn h(input: impl AsRef<[u8]>) -> String {
    let mut hasher = Blake2s256::new();
    hasher.update(input.as_ref());
    hex::encode_bare(hasher.finalize())
}

/// `H(a || b)`: the two-string concatenation form used for `hash`,
/// `merkle_root`, and `work` derivations throughout the spec.
pub fn h2(a: impl AsRef<[u8]>, b: impl AsRef<[u8]>) -> String {
    let mut hasher = Blake2s256::new();
    hasher.update(a.as_ref());
    hasher.update(b.as_ref());
    hex::encode_bare(hasher.finalize())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(h("abc"), h("abc"));
        assert_ne!(h("abc"), h("abd"));
    }

    #[test]
    fn h2_is_not_commutative() {
        assert_ne!(h2("a", "b"), h2("b", "a"));
    }
}
