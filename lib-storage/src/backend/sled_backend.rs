//! Persistent sled backend
//!
//! Durable storage for the eternal store. Balances and allowances written
//! here survive process restarts and any number of logic upgrades, so a
//! reopened store must hand back exactly what the last flush committed.

use super::{BatchOp, KeyValueBackend};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

/// Page cache for one store. Token state is a few keys per holder.
const CACHE_BYTES: u64 = 8 * 1024 * 1024;

/// Eternal store contents in a sled tree
///
/// Cloning shares the same `sled::Db`.
#[derive(Clone, Debug)]
pub struct SledBackend {
    db: sled::Db,
}

impl SledBackend {
    /// Open the store at `path`, creating it on first use
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = Self::config()
            .path(path)
            .open()
            .with_context(|| format!("opening eternal store at {}", path.display()))?;

        if db.was_recovered() {
            info!("Recovered eternal store at {} ({} keys)", path.display(), db.len());
        } else {
            debug!("Created eternal store at {}", path.display());
        }
        Ok(Self { db })
    }

    /// Store that is deleted when the last handle drops
    pub fn temporary() -> Result<Self> {
        let db = Self::config()
            .temporary(true)
            .open()
            .context("opening temporary eternal store")?;
        Ok(Self { db })
    }

    fn config() -> sled::Config {
        // Writes are small and rare next to reads
        sled::Config::default()
            .cache_capacity(CACHE_BYTES)
            .mode(sled::Mode::LowSpace)
    }
}

fn owned(value: Option<sled::IVec>) -> Option<Vec<u8>> {
    value.map(|v| v.to_vec())
}

impl KeyValueBackend for SledBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db.get(key).map(owned).context("sled read")
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db.insert(key, value).map(owned).context("sled write")
    }

    fn remove(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db.remove(key).map(owned).context("sled delete")
    }

    fn contains_key(&self, key: &[u8]) -> Result<bool> {
        self.db.contains_key(key).context("sled lookup")
    }

    fn write_batch(&self, ops: &[BatchOp]) -> Result<()> {
        let batch = ops.iter().fold(sled::Batch::default(), |mut batch, op| {
            match op {
                BatchOp::Put { key, value } => batch.insert(key.as_slice(), value.as_slice()),
                BatchOp::Delete { key } => batch.remove(key.as_slice()),
            }
            batch
        });
        self.db
            .apply_batch(batch)
            .with_context(|| format!("sled batch of {} op(s)", ops.len()))
    }

    fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut keys = Vec::new();
        for item in self.db.scan_prefix(prefix) {
            let (key, _) = item.context("sled prefix scan")?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    fn flush(&self) -> Result<()> {
        let bytes = self.db.flush().context("sled flush")?;
        debug!("Flushed {} byte(s) of eternal store", bytes);
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.db.len())
    }

    fn backend_type(&self) -> &'static str {
        "sled"
    }
}
