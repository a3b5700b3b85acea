use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use traits::Persistence;

use crate::error::StorageError;

/// In-memory `Persistence` backend. Used by tests and by components that
/// never need their writes to survive a restart (the block pool's scratch
/// cache during backward sync, for instance).
#[derive(Debug, Default)]
pub struct MemStore {
    inner: RwLock<BTreeMap<String, Arc<Vec<u8>>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for MemStore {
    fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.inner.read().map_err(|_| StorageError::RWPoison)?;
        Ok(store.get(key).map(|v| v.as_ref().clone()))
    }

    fn put_bytes(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut store = self.inner.write().map_err(|_| StorageError::RWPoison)?;
        store.insert(key.to_string(), Arc::new(value));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut store = self.inner.write().map_err(|_| StorageError::RWPoison)?;
        store.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn put_then_get_roundtrips() {
        let store = MemStore::new();
        store.put_bytes("k", b"v".to_vec()).unwrap();
        assert_eq!(store.get_bytes("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn missing_key_is_none() {
        let store = MemStore::new();
        assert_eq!(store.get_bytes("missing").unwrap(), None);
    }

    #[test]
    fn get_many_preserves_order() {
        let store = MemStore::new();
        store.put_bytes("a", b"1".to_vec()).unwrap();
        store.put_bytes("c", b"3".to_vec()).unwrap();
        let got = store
            .get_many_bytes(&["a".to_string(), "b".to_string(), "c".to_string()])
            .unwrap();
        assert_eq!(got, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
    }
}
