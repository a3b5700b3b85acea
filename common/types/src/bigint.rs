use std::fmt;
use std::ops::{Add, Deref, DerefMut};
use std::str::FromStr;

use num_bigint::BigInt;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An unbounded integer that crosses process/wire/storage boundaries as a
/// base-16 string, per the `difficulty`/`distance`/`total_distance` fields of
/// `ParentBlock`. Arithmetic stays on `BigInt`; only serialization narrows to
/// hex text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BigIntHex(pub BigInt);

impl BigIntHex {
    pub fn zero() -> Self {
        Self(BigInt::from(0))
    }

    pub fn from_u64(v: u64) -> Self {
        Self(BigInt::from(v))
    }

    pub fn to_hex(&self) -> String {
        let (sign, bytes) = self.0.to_bytes_be();
        let prefix = if sign == num_bigint::Sign::Minus {
            "-"
        } else {
            ""
        };
        format!("{}0x{}", prefix, hex::encode_bare(bytes))
    }

    pub fn from_hex(s: &str) -> anyhow::Result<Self> {
        let (neg, s) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let s = s.strip_prefix("0x").unwrap_or(s);
        let s = if s.is_empty() { "0" } else { s };
        let mut v = BigInt::parse_bytes(s.as_bytes(), 16)
            .ok_or_else(|| anyhow::anyhow!("invalid hex integer: {}", s))?;
        if neg {
            v = -v;
        }
        Ok(Self(v))
    }

    /// Narrows to a 53-bit (JS-safe) integer, the final representation of
    /// `ParentBlock::difficulty`.
    pub fn fits_53_bits(&self) -> bool {
        self.0 >= BigInt::from(0) && self.0 < (BigInt::from(1u64) << 53)
    }
}

impl FromStr for BigIntHex {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for BigIntHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Deref for BigIntHex {
    type Target = BigInt;
    fn deref(&self) -> &BigInt {
        &self.0
    }
}

impl DerefMut for BigIntHex {
    fn deref_mut(&mut self) -> &mut BigInt {
        &mut self.0
    }
}

impl From<BigInt> for BigIntHex {
    fn from(v: BigInt) -> Self {
        Self(v)
    }
}

impl Add for BigIntHex {
    type Output = BigIntHex;
    fn add(self, rhs: Self) -> Self::Output {
        BigIntHex(self.0 + rhs.0)
    }
}

impl Serialize for BigIntHex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BigIntHex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct HexVisitor;
        impl<'de> Visitor<'de> for HexVisitor {
            type Value = BigIntHex;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a hex-encoded integer string")
            }
            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                BigIntHex::from_hex(v).map_err(de::Error::custom)
            }
        }
        deserializer.deserialize_str(HexVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn roundtrips_through_hex() {
        let v = BigIntHex::from_u64(0x11801972029393);
        let s = v.to_hex();
        let back = BigIntHex::from_hex(&s).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn fits_53_bits_boundary() {
        assert!(BigIntHex::from_u64((1u64 << 53) - 1).fits_53_bits());
        assert!(!BigIntHex::from_u64(1u64 << 53).fits_53_bits());
    }
}
