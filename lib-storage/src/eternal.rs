//! EternalStorage - admin-gated key/value store
//!
//! Holds every mutable balance, allowance and metadata entry of a token.
//! Logic contracts come and go; this store stays.
//!
//! # Access Gate
//!
//! - Reads are unrestricted.
//! - Every write (single setter or batch) requires the caller to be an admin.
//! - Admin rights are granted and revoked only by the store owner.
//! - Keys under [`RESERVED_PREFIX`] belong to the store itself and cannot be
//!   written through the gate, so an admin cannot grant admin rights.
//!
//! # Typed Views
//!
//! | View    | Encoding              | Unset value |
//! |---------|-----------------------|-------------|
//! | uint    | u128, 16 bytes BE     | 0           |
//! | bool    | 1 byte (0 / 1)        | false       |
//! | address | 32 raw bytes          | zero        |
//! | string  | UTF-8                 | ""          |

use crate::backend::{BatchOp, KeyValueBackend, MemoryBackend};
use crate::errors::{describe_key, StorageError, StorageResult};
use lib_types::{Address, Amount};
use tracing::{debug, info, warn};

/// Layout version stamped into every store at genesis
pub const SCHEMA_VERSION: u32 = 1;

/// Keys owned by the store itself
pub const RESERVED_PREFIX: &[u8] = b"eternal:";

const OWNER_KEY: &[u8] = b"eternal:owner";
const ADDRESS_KEY: &[u8] = b"eternal:address";
const SCHEMA_KEY: &[u8] = b"eternal:schema_version";
const ADMIN_PREFIX: &[u8] = b"eternal:admin:";

/// Key for an admin flag: `eternal:admin:` + address (32 bytes)
fn admin_key(admin: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(ADMIN_PREFIX.len() + 32);
    key.extend_from_slice(ADMIN_PREFIX);
    key.extend_from_slice(admin.as_bytes());
    key
}

// =============================================================================
// VALUE ENCODING
// =============================================================================

pub fn encode_uint(value: Amount) -> [u8; 16] {
    value.to_be_bytes()
}

pub fn decode_uint(key: &[u8], bytes: &[u8]) -> StorageResult<Amount> {
    let array: [u8; 16] = bytes.try_into().map_err(|_| StorageError::InvalidValue {
        key: describe_key(key),
        expected: "16-byte uint",
    })?;
    Ok(Amount::from_be_bytes(array))
}

pub fn decode_bool(key: &[u8], bytes: &[u8]) -> StorageResult<bool> {
    match bytes {
        [0] => Ok(false),
        [1] => Ok(true),
        _ => Err(StorageError::InvalidValue {
            key: describe_key(key),
            expected: "1-byte bool",
        }),
    }
}

pub fn decode_address(key: &[u8], bytes: &[u8]) -> StorageResult<Address> {
    let array: [u8; 32] = bytes.try_into().map_err(|_| StorageError::InvalidValue {
        key: describe_key(key),
        expected: "32-byte address",
    })?;
    Ok(Address::new(array))
}

pub fn decode_string(key: &[u8], bytes: &[u8]) -> StorageResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| StorageError::InvalidValue {
        key: describe_key(key),
        expected: "UTF-8 string",
    })
}

// =============================================================================
// BATCH
// =============================================================================

/// Ordered set of writes committed as one unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageBatch {
    ops: Vec<BatchOp>,
}

impl StorageBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_uint(&mut self, key: impl AsRef<[u8]>, value: Amount) -> &mut Self {
        self.put(key, encode_uint(value).to_vec())
    }

    pub fn set_bool(&mut self, key: impl AsRef<[u8]>, value: bool) -> &mut Self {
        self.put(key, vec![value as u8])
    }

    pub fn set_address(&mut self, key: impl AsRef<[u8]>, value: &Address) -> &mut Self {
        self.put(key, value.as_bytes().to_vec())
    }

    pub fn set_string(&mut self, key: impl AsRef<[u8]>, value: &str) -> &mut Self {
        self.put(key, value.as_bytes().to_vec())
    }

    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> &mut Self {
        self.ops.push(BatchOp::Delete {
            key: key.as_ref().to_vec(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    fn put(&mut self, key: impl AsRef<[u8]>, value: Vec<u8>) -> &mut Self {
        self.ops.push(BatchOp::Put {
            key: key.as_ref().to_vec(),
            value,
        });
        self
    }
}

// =============================================================================
// ETERNAL STORAGE
// =============================================================================

/// Persistent store shared by every logic version of one token
#[derive(Debug)]
pub struct EternalStorage<B: KeyValueBackend = MemoryBackend> {
    address: Address,
    owner: Address,
    backend: B,
}

impl EternalStorage<MemoryBackend> {
    /// Genesis on a fresh in-memory backend
    pub fn in_memory(owner: Address, address: Address) -> StorageResult<Self> {
        Self::new(owner, address, MemoryBackend::new())
    }
}

impl<B: KeyValueBackend> EternalStorage<B> {
    /// Genesis: stamp owner, address and schema version into an empty store
    ///
    /// # Errors
    /// `AlreadyInitialized` if the backend already holds a store
    pub fn new(owner: Address, address: Address, backend: B) -> StorageResult<Self> {
        if backend.contains_key(SCHEMA_KEY)? {
            return Err(StorageError::AlreadyInitialized);
        }

        backend.write_batch(&[
            BatchOp::Put {
                key: OWNER_KEY.to_vec(),
                value: owner.as_bytes().to_vec(),
            },
            BatchOp::Put {
                key: ADDRESS_KEY.to_vec(),
                value: address.as_bytes().to_vec(),
            },
            BatchOp::Put {
                key: SCHEMA_KEY.to_vec(),
                value: encode_uint(SCHEMA_VERSION as Amount).to_vec(),
            },
        ])?;

        info!(
            "Eternal storage {} created on {} backend (owner {}, schema v{})",
            address,
            backend.backend_type(),
            owner,
            SCHEMA_VERSION
        );

        Ok(Self {
            address,
            owner,
            backend,
        })
    }

    /// Reopen a store created earlier on a durable backend
    ///
    /// # Errors
    /// `NotInitialized` if the backend never went through genesis
    pub fn open(backend: B) -> StorageResult<Self> {
        if !backend.contains_key(SCHEMA_KEY)? {
            return Err(StorageError::NotInitialized);
        }

        let owner = match backend.get(OWNER_KEY)? {
            Some(bytes) => decode_address(OWNER_KEY, &bytes)?,
            None => return Err(StorageError::NotInitialized),
        };
        let address = match backend.get(ADDRESS_KEY)? {
            Some(bytes) => decode_address(ADDRESS_KEY, &bytes)?,
            None => return Err(StorageError::NotInitialized),
        };

        debug!("Eternal storage {} reopened", address);
        Ok(Self {
            address,
            owner,
            backend,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Layout version stamped at genesis
    pub fn schema_version(&self) -> StorageResult<u32> {
        let raw = self.get_uint(SCHEMA_KEY)?;
        u32::try_from(raw).map_err(|_| StorageError::InvalidValue {
            key: describe_key(SCHEMA_KEY),
            expected: "u32 schema version",
        })
    }

    // ─── Admin Set ──────────────────────────────────────────────────────

    pub fn is_admin(&self, address: &Address) -> StorageResult<bool> {
        self.get_bool(admin_key(address))
    }

    /// Every address currently holding write capability
    pub fn admins(&self) -> StorageResult<Vec<Address>> {
        let mut admins = Vec::new();
        for key in self.backend.keys_with_prefix(ADMIN_PREFIX)? {
            if self.get_bool(&key)? {
                admins.push(decode_address(&key, &key[ADMIN_PREFIX.len()..])?);
            }
        }
        Ok(admins)
    }

    /// Grant write capability (owner only)
    pub fn add_admin(&self, caller: &Address, admin: &Address) -> StorageResult<()> {
        self.ensure_owner(caller, "add admins")?;
        self.backend.put(&admin_key(admin), &[1])?;
        info!("Storage {}: admin {} added", self.address, admin);
        Ok(())
    }

    /// Revoke write capability (owner only)
    pub fn remove_admin(&self, caller: &Address, admin: &Address) -> StorageResult<()> {
        self.ensure_owner(caller, "remove admins")?;
        self.backend.remove(&admin_key(admin))?;
        info!("Storage {}: admin {} removed", self.address, admin);
        Ok(())
    }

    // ─── Reads ──────────────────────────────────────────────────────────

    pub fn get_raw(&self, key: impl AsRef<[u8]>) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.backend.get(key.as_ref())?)
    }

    pub fn get_uint(&self, key: impl AsRef<[u8]>) -> StorageResult<Amount> {
        let key = key.as_ref();
        match self.backend.get(key)? {
            Some(bytes) => decode_uint(key, &bytes),
            None => Ok(0),
        }
    }

    pub fn get_bool(&self, key: impl AsRef<[u8]>) -> StorageResult<bool> {
        let key = key.as_ref();
        match self.backend.get(key)? {
            Some(bytes) => decode_bool(key, &bytes),
            None => Ok(false),
        }
    }

    pub fn get_address(&self, key: impl AsRef<[u8]>) -> StorageResult<Address> {
        let key = key.as_ref();
        match self.backend.get(key)? {
            Some(bytes) => decode_address(key, &bytes),
            None => Ok(Address::zero()),
        }
    }

    pub fn get_string(&self, key: impl AsRef<[u8]>) -> StorageResult<String> {
        let key = key.as_ref();
        match self.backend.get(key)? {
            Some(bytes) => decode_string(key, &bytes),
            None => Ok(String::new()),
        }
    }

    // ─── Gated Writes ───────────────────────────────────────────────────

    pub fn set_uint(&self, caller: &Address, key: impl AsRef<[u8]>, value: Amount) -> StorageResult<()> {
        let mut batch = StorageBatch::new();
        batch.set_uint(key, value);
        self.commit(caller, batch)
    }

    pub fn set_bool(&self, caller: &Address, key: impl AsRef<[u8]>, value: bool) -> StorageResult<()> {
        let mut batch = StorageBatch::new();
        batch.set_bool(key, value);
        self.commit(caller, batch)
    }

    pub fn set_address(&self, caller: &Address, key: impl AsRef<[u8]>, value: &Address) -> StorageResult<()> {
        let mut batch = StorageBatch::new();
        batch.set_address(key, value);
        self.commit(caller, batch)
    }

    pub fn set_string(&self, caller: &Address, key: impl AsRef<[u8]>, value: &str) -> StorageResult<()> {
        let mut batch = StorageBatch::new();
        batch.set_string(key, value);
        self.commit(caller, batch)
    }

    pub fn delete(&self, caller: &Address, key: impl AsRef<[u8]>) -> StorageResult<()> {
        let mut batch = StorageBatch::new();
        batch.delete(key);
        self.commit(caller, batch)
    }

    /// Apply a batch of writes atomically on behalf of `caller`
    ///
    /// Either every operation lands or none does.
    pub fn commit(&self, caller: &Address, batch: StorageBatch) -> StorageResult<()> {
        self.ensure_admin(caller)?;

        for op in batch.ops() {
            let key = op.key();
            if key.is_empty() {
                return Err(StorageError::EmptyKey);
            }
            if key.starts_with(RESERVED_PREFIX) {
                return Err(StorageError::ReservedKey(describe_key(key)));
            }
        }

        if batch.is_empty() {
            return Ok(());
        }

        self.backend.write_batch(batch.ops())?;
        debug!(
            "Storage {}: {} committed {} write(s)",
            self.address,
            caller,
            batch.len()
        );
        Ok(())
    }

    fn ensure_admin(&self, caller: &Address) -> StorageResult<()> {
        if self.is_admin(caller)? {
            return Ok(());
        }
        warn!("Storage {}: write rejected for non-admin {}", self.address, caller);
        Err(StorageError::Unauthorized {
            caller: *caller,
            action: "write storage",
        })
    }

    fn ensure_owner(&self, caller: &Address, action: &'static str) -> StorageResult<()> {
        if *caller == self.owner {
            return Ok(());
        }
        warn!("Storage {}: {} rejected for non-owner {}", self.address, action, caller);
        Err(StorageError::Unauthorized {
            caller: *caller,
            action,
        })
    }
}
