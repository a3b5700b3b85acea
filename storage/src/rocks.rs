use std::path::Path;

use anyhow::Result;
use traits::Persistence;

pub fn default_write_opts() -> rocksdb::WriteOptions {
    let mut opts = rocksdb::WriteOptions::default();
    opts.set_sync(true);
    opts
}

/// RocksDB-backed `Persistence`. A single default column family holds every
/// key this core touches (`bc.block.*`, `<chain>.block.latest`, `appversion`,
/// `rovers`) — the spec's key layout is already namespaced by prefix, so
/// there is no need for RocksDB column families on top of that.
pub struct RocksStore {
    db: rocksdb::DB,
}

impl RocksStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        let db = rocksdb::DB::open(&opts, path)?;
        Ok(Self { db })
    }
}

impl Persistence for RocksStore {
    fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key.as_bytes())?)
    }

    fn put_bytes(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.db
            .put_opt(key.as_bytes(), value, &default_write_opts())
            .map_err(|e| e.into())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.db.delete(key.as_bytes()).map_err(|e| e.into())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.db.get_pinned(key.as_bytes())?.is_some())
    }
}
