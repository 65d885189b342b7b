//! Durable key-value persistence for blocks and the head pointer.
//!
//! Two logical key spaces: block records keyed by their 32-byte hash, and the
//! single well-known key `"lh"` holding the hash of the chain tip. The store
//! never interprets block bytes; decoding belongs to [`crate::block`].

use crate::error::{LedgerError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Metadata key holding the hash of the most recently admitted block.
pub const HEAD_KEY: &str = "lh";

/// Abstraction over the durable key-value backend.
///
/// `commit_block` is the only write path: it persists a block record and
/// advances the head pointer in one transaction, guarded by a compare-and-swap
/// on the head. Either both writes land or neither does.
pub trait BlockStore: Send + Sync {
    /// Fetch the encoded block stored under `hash`.
    fn get_block(&self, hash: &[u8]) -> Result<Vec<u8>>;

    /// True iff a block record exists under `hash`.
    fn contains_block(&self, hash: &[u8]) -> Result<bool>;

    /// Current head pointer, or `None` before genesis exists.
    fn head(&self) -> Result<Option<Vec<u8>>>;

    /// Persist `encoded` under `hash` and set the head pointer to `hash`,
    /// atomically. The commit is accepted only if the stored head still equals
    /// `expected_head` (`None` meaning "no head yet"); otherwise it fails with
    /// [`LedgerError::StaleHead`] and the store is left untouched.
    fn commit_block(&self, hash: &[u8], encoded: &[u8], expected_head: Option<&[u8]>)
        -> Result<()>;
}

fn stale_head_message(expected: Option<&[u8]>, found: Option<&[u8]>) -> String {
    let show = |h: Option<&[u8]>| h.map(hex::encode).unwrap_or_else(|| "<none>".to_string());
    format!("expected head {}, found {}", show(expected), show(found))
}

// ---------------------------------------------------------------------------
// SQLite backend
// ---------------------------------------------------------------------------

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| LedgerError::Storage(format!("Failed to open database: {}", e)))?;
        Self::init_schema(conn)
    }

    /// Ephemeral database for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            LedgerError::Storage(format!("Failed to open in-memory database: {}", e))
        })?;
        Self::init_schema(conn)
    }

    fn init_schema(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                hash BLOB PRIMARY KEY,
                data BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| LedgerError::Storage(format!("Failed to create blocks table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| LedgerError::Storage(format!("Failed to create metadata table: {}", e)))?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::Storage("Mutex poisoned".to_string()))
    }
}

impl BlockStore for Database {
    fn get_block(&self, hash: &[u8]) -> Result<Vec<u8>> {
        let conn = self.lock()?;
        let row: Option<Vec<u8>> = conn
            .query_row(
                "SELECT data FROM blocks WHERE hash = ?1",
                params![hash],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| LedgerError::Storage(format!("Failed to query block: {}", e)))?;

        row.ok_or_else(|| LedgerError::NotFound(hex::encode(hash)))
    }

    fn contains_block(&self, hash: &[u8]) -> Result<bool> {
        let conn = self.lock()?;
        let row: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM blocks WHERE hash = ?1",
                params![hash],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| LedgerError::Storage(format!("Failed to query block: {}", e)))?;
        Ok(row.is_some())
    }

    fn head(&self) -> Result<Option<Vec<u8>>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            params![HEAD_KEY],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| LedgerError::Storage(format!("Failed to query head pointer: {}", e)))
    }

    fn commit_block(
        &self,
        hash: &[u8],
        encoded: &[u8],
        expected_head: Option<&[u8]>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| LedgerError::Storage(format!("Failed to start transaction: {}", e)))?;

        let current: Option<Vec<u8>> = tx
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                params![HEAD_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| LedgerError::Storage(format!("Failed to read head pointer: {}", e)))?;

        if current.as_deref() != expected_head {
            return Err(LedgerError::StaleHead(stale_head_message(
                expected_head,
                current.as_deref(),
            )));
        }

        tx.execute(
            "INSERT OR REPLACE INTO blocks (hash, data) VALUES (?1, ?2)",
            params![hash, encoded],
        )
        .map_err(|e| LedgerError::Storage(format!("Failed to save block: {}", e)))?;

        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![HEAD_KEY, hash],
        )
        .map_err(|e| LedgerError::Storage(format!("Failed to update head pointer: {}", e)))?;

        tx.commit()
            .map_err(|e| LedgerError::Storage(format!("Failed to commit transaction: {}", e)))
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// In-memory store for tests and ephemeral runs. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    blocks: HashMap<Vec<u8>, Vec<u8>>,
    head: Option<Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| LedgerError::Storage("Mutex poisoned".to_string()))
    }
}

impl BlockStore for MemoryStore {
    fn get_block(&self, hash: &[u8]) -> Result<Vec<u8>> {
        let inner = self.lock()?;
        inner
            .blocks
            .get(hash)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(hex::encode(hash)))
    }

    fn contains_block(&self, hash: &[u8]) -> Result<bool> {
        Ok(self.lock()?.blocks.contains_key(hash))
    }

    fn head(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.head.clone())
    }

    fn commit_block(
        &self,
        hash: &[u8],
        encoded: &[u8],
        expected_head: Option<&[u8]>,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.head.as_deref() != expected_head {
            return Err(LedgerError::StaleHead(stale_head_message(
                expected_head,
                inner.head.as_deref(),
            )));
        }
        inner.blocks.insert(hash.to_vec(), encoded.to_vec());
        inner.head = Some(hash.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_store(store: &dyn BlockStore) {
        assert_eq!(store.head().unwrap(), None);
        assert!(!store.contains_block(b"missing").unwrap());
        assert!(matches!(
            store.get_block(b"missing"),
            Err(LedgerError::NotFound(_))
        ));

        // First commit expects an absent head.
        store.commit_block(b"hash-a", b"block-a", None).unwrap();
        assert_eq!(store.head().unwrap(), Some(b"hash-a".to_vec()));
        assert_eq!(store.get_block(b"hash-a").unwrap(), b"block-a");
        assert!(store.contains_block(b"hash-a").unwrap());

        // Chained commit against the current head.
        store
            .commit_block(b"hash-b", b"block-b", Some(b"hash-a".as_slice()))
            .unwrap();
        assert_eq!(store.head().unwrap(), Some(b"hash-b".to_vec()));

        // Losing the compare-and-swap leaves both key spaces untouched.
        let err = store
            .commit_block(b"hash-c", b"block-c", Some(b"hash-a".as_slice()))
            .unwrap_err();
        assert!(matches!(err, LedgerError::StaleHead(_)));
        assert_eq!(store.head().unwrap(), Some(b"hash-b".to_vec()));
        assert!(!store.contains_block(b"hash-c").unwrap());

        // A second "genesis" commit must also lose.
        assert!(matches!(
            store.commit_block(b"hash-d", b"block-d", None),
            Err(LedgerError::StaleHead(_))
        ));
    }

    #[test]
    fn test_memory_store_contract() {
        let store = MemoryStore::new();
        check_store(&store);
    }

    #[test]
    fn test_database_contract() {
        let store = Database::open_in_memory().unwrap();
        check_store(&store);
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.commit_block(b"h", b"data", None).unwrap();
        assert_eq!(b.head().unwrap(), Some(b"h".to_vec()));
        assert_eq!(b.get_block(b"h").unwrap(), b"data");
    }

    #[test]
    fn test_database_persists_across_connections() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        let path = path.to_str().unwrap();

        {
            let store = Database::open(path).unwrap();
            store.commit_block(b"hash-a", b"block-a", None).unwrap();
        }

        let store = Database::open(path).unwrap();
        assert_eq!(store.head().unwrap(), Some(b"hash-a".to_vec()));
        assert_eq!(store.get_block(b"hash-a").unwrap(), b"block-a");
    }
}
