use anyhow::Result;

/// The ordered key/value persistence seam (spec §4, "Persistence interface").
/// Keys are always UTF-8 strings; values are opaque bytes — typed
/// (de)serialization lives in `storage`'s `TypedStore` extension trait so
/// this crate stays free of a serde dependency.
pub trait Persistence: Send + Sync {
    fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put_bytes(&self, key: &str, value: Vec<u8>) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get_bytes(key)?.is_some())
    }
    /// Batched multi-key get, preserving the order of `keys`.
    fn get_many_bytes(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|k| self.get_bytes(k)).collect()
    }
}

/// The monotonic + NTP-corrected wall clock seam (spec §4.1). Abstracted so
/// tests can substitute a fixed clock without starting the background
/// adjuster.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
    fn now_s(&self) -> u64 {
        self.now_ms() / 1000
    }
}
