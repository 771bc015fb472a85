//! In-memory backend for testing and development
//!
//! All data is lost on process termination.

use super::{BatchOp, KeyValueBackend};
use anyhow::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory ordered map backend
///
/// BTreeMap keeps prefix scans in lexicographic order, matching sled.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    storage: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let storage = self.storage.read();
        Ok(storage.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut storage = self.storage.write();
        Ok(storage.insert(key.to_vec(), value.to_vec()))
    }

    fn remove(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut storage = self.storage.write();
        Ok(storage.remove(key))
    }

    fn contains_key(&self, key: &[u8]) -> Result<bool> {
        let storage = self.storage.read();
        Ok(storage.contains_key(key))
    }

    fn write_batch(&self, ops: &[BatchOp]) -> Result<()> {
        // One write lock for the whole batch: no reader sees a partial state
        let mut storage = self.storage.write();
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    storage.insert(key.clone(), value.clone());
                }
                BatchOp::Delete { key } => {
                    storage.remove(key);
                }
            }
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let storage = self.storage.read();
        Ok(storage
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.storage.read().len())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_data() {
        let backend = MemoryBackend::new();
        let handle = backend.clone();
        backend.put(b"key1", b"value1").unwrap();
        assert_eq!(handle.get(b"key1").unwrap(), Some(b"value1".to_vec()));
    }

    #[test]
    fn test_prefix_scan_stops_at_prefix_boundary() {
        let backend = MemoryBackend::new();
        backend.put(b"prefix:key1", b"value1").unwrap();
        backend.put(b"prefix:key2", b"value2").unwrap();
        backend.put(b"prefiy", b"value3").unwrap();
        backend.put(b"other:key", b"value4").unwrap();

        let keys = backend.keys_with_prefix(b"prefix:").unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(backend.keys_with_prefix(b"").unwrap().len(), 4);
    }
}
