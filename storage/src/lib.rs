use std::sync::Arc;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use traits::Persistence;

pub mod error;
pub mod memstore;
pub mod rocks;

pub use memstore::MemStore;
pub use rocks::RocksStore;

/// Either backend behind one handle, so callers (engine, multiverse,
/// blockpool) don't need to be generic over the storage implementation.
#[derive(Clone)]
pub enum PersistentStorage {
    Mem(Arc<MemStore>),
    Rocks(Arc<RocksStore>),
}

impl PersistentStorage {
    pub fn memory() -> Self {
        Self::Mem(Arc::new(MemStore::new()))
    }

    pub fn rocks(store: RocksStore) -> Self {
        Self::Rocks(Arc::new(store))
    }
}

impl Persistence for PersistentStorage {
    fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Mem(s) => s.get_bytes(key),
            Self::Rocks(s) => s.get_bytes(key),
        }
    }

    fn put_bytes(&self, key: &str, value: Vec<u8>) -> Result<()> {
        match self {
            Self::Mem(s) => s.put_bytes(key, value),
            Self::Rocks(s) => s.put_bytes(key, value),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self {
            Self::Mem(s) => s.delete(key),
            Self::Rocks(s) => s.delete(key),
        }
    }

    fn contains(&self, key: &str) -> Result<bool> {
        match self {
            Self::Mem(s) => s.contains(key),
            Self::Rocks(s) => s.contains(key),
        }
    }

    fn get_many_bytes(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        match self {
            Self::Mem(s) => s.get_many_bytes(keys),
            Self::Rocks(s) => s.get_many_bytes(keys),
        }
    }
}

/// JSON-typed convenience layer over any `Persistence` backend. The engine
/// and multiverse only ever read/write whole `ParentBlock`s and similar
/// structs, never raw bytes.
pub trait TypedStore: Persistence {
    fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_bytes(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_typed<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.put_bytes(key, serde_json::to_vec(value)?)
    }

    fn get_many_typed<T: DeserializeOwned>(&self, keys: &[String]) -> Result<Vec<Option<T>>> {
        self.get_many_bytes(keys)?
            .into_iter()
            .map(|entry| match entry {
                Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                None => Ok(None),
            })
            .collect()
    }
}

impl<P: Persistence + ?Sized> TypedStore for P {}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Widget {
        name: String,
        count: u32,
    }

    #[test]
    fn typed_roundtrip_through_memstore() {
        let store = PersistentStorage::memory();
        let widget = Widget {
            name: "bolt".to_string(),
            count: 4,
        };
        store.put_typed("widget", &widget).unwrap();
        let got: Option<Widget> = store.get_typed("widget").unwrap();
        assert_eq!(got, Some(widget));
    }

    #[test]
    fn typed_missing_key_is_none() {
        let store = PersistentStorage::memory();
        let got: Option<Widget> = store.get_typed("missing").unwrap();
        assert_eq!(got, None);
    }
}
