//! Key/value backend trait for EternalStorage
//!
//! Provides abstraction over the byte store underneath the admin gate
//! (in-memory HashMap, persistent sled). EternalStorage never sees which one
//! it runs on.
//!
//! # Design
//!
//! - **Byte-level interface**: `&[u8]` keys and values
//! - **Sync operations**: every call runs to completion before the next
//! - **Clone semantics**: backends are cheap handles (Arc inside)
//! - **Atomic batches**: `write_batch` applies all operations or none
//!
//! # Implementations
//!
//! - `MemoryBackend`: in-memory, for tests and development
//! - `SledBackend`: persistent, survives restarts

pub mod memory;
pub mod sled_backend;

use anyhow::Result;
use std::fmt;

pub use memory::MemoryBackend;
pub use sled_backend::SledBackend;

/// Batch operation for atomic writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Remove a key
    Delete { key: Vec<u8> },
}

impl BatchOp {
    /// Key touched by this operation
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOp::Put { key, .. } => key,
            BatchOp::Delete { key } => key,
        }
    }
}

/// Storage backend trait
///
/// All implementations must be thread-safe (Send + Sync) and cheaply
/// cloneable. Cloning creates a new handle to the same data, never a copy.
pub trait KeyValueBackend: Send + Sync + Clone + fmt::Debug {
    /// Retrieve a value by key
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Insert or update a key-value pair, returning the previous value
    fn put(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Remove a key, returning the removed value
    fn remove(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Check if a key exists
    fn contains_key(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Apply every operation in order, atomically
    fn write_batch(&self, ops: &[BatchOp]) -> Result<()>;

    /// All keys starting with `prefix`, in lexicographic order
    fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// Flush pending writes to durable storage
    ///
    /// For in-memory backends, this is a no-op.
    fn flush(&self) -> Result<()>;

    /// Number of entries in storage
    fn len(&self) -> Result<usize>;

    /// Check if storage is empty
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Short backend name for logging ("memory", "sled")
    fn backend_type(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Same suite for every backend
    fn check_backend_contract<B: KeyValueBackend>(backend: B) -> Result<()> {
        assert_eq!(backend.get(b"key1")?, None);
        assert_eq!(backend.put(b"key1", b"value1")?, None);
        assert_eq!(backend.put(b"key1", b"value2")?, Some(b"value1".to_vec()));
        assert!(backend.contains_key(b"key1")?);

        backend.write_batch(&[
            BatchOp::Put { key: b"a:1".to_vec(), value: b"x".to_vec() },
            BatchOp::Put { key: b"a:2".to_vec(), value: b"y".to_vec() },
            BatchOp::Delete { key: b"key1".to_vec() },
        ])?;
        assert_eq!(backend.get(b"key1")?, None);
        assert_eq!(backend.keys_with_prefix(b"a:")?, vec![b"a:1".to_vec(), b"a:2".to_vec()]);
        assert_eq!(backend.len()?, 2);

        assert_eq!(backend.remove(b"a:1")?, Some(b"x".to_vec()));
        assert!(!backend.contains_key(b"a:1")?);
        backend.flush()?;
        Ok(())
    }

    #[test]
    fn test_memory_backend_contract() -> Result<()> {
        check_backend_contract(MemoryBackend::new())
    }

    #[test]
    fn test_sled_backend_contract() -> Result<()> {
        check_backend_contract(SledBackend::temporary()?)
    }

    #[test]
    fn test_batch_op_key() {
        let op = BatchOp::Delete { key: b"k".to_vec() };
        assert_eq!(op.key(), b"k");
    }
}
