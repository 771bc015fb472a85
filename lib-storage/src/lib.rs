//! Eternal Storage
//!
//! A persistent key/value store that outlives any single token logic version.
//! Every write goes through the admin gate: only addresses the store owner has
//! granted admin rights may mutate state. Reads are unrestricted.
//!
//! # Architecture
//!
//! ```text
//! TokenLogic (v1, v2, ...)
//!     └─> EternalStorage  (admin gate, typed views, schema stamp)
//!         └─> KeyValueBackend
//!             ├─> MemoryBackend (tests, development)
//!             └─> SledBackend   (durable)
//! ```
//!
//! Replacing logic means granting a new logic address admin rights on the same
//! store and revoking the old one. No data is migrated.

pub mod backend;
pub mod errors;
pub mod eternal;

pub use backend::{BatchOp, KeyValueBackend, MemoryBackend, SledBackend};
pub use errors::{StorageError, StorageResult};
pub use eternal::{EternalStorage, StorageBatch, RESERVED_PREFIX, SCHEMA_VERSION};
