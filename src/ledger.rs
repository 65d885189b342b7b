//! Append-only chain over a block store.
//!
//! The chain has no in-memory linked representation: blocks live in the store
//! addressed by content hash, and traversal reconstructs the chain on demand
//! by following `prev_hash` pointers from the head. The only mutable state is
//! the head pointer, advanced exclusively by successful appends.

use crate::block::{Block, Candidate};
use crate::error::{LedgerError, Result};
use crate::pow::ProofOfWork;
use crate::store::BlockStore;
use parking_lot::RwLock;
use tracing::{debug, info};

pub struct Ledger {
    head: RwLock<Vec<u8>>,
    store: Box<dyn BlockStore>,
}

impl Ledger {
    /// Open a ledger over `store`, mining and persisting the genesis block if
    /// the store holds no head pointer yet. The genesis path runs exactly once
    /// per store lifetime; reopening an initialized store only re-reads the
    /// persisted head.
    pub fn open(store: Box<dyn BlockStore>) -> Result<Self> {
        match store.head()? {
            Some(head) => {
                info!("Loaded existing ledger (head = {})", hex::encode(&head));
                Ok(Ledger {
                    head: RwLock::new(head),
                    store,
                })
            }
            None => {
                info!("No existing ledger found; mining genesis block");
                let genesis = ProofOfWork::new().mine(Candidate::genesis())?;
                store.commit_block(&genesis.hash, &genesis.encode(), None)?;
                info!("Genesis proved (hash = {})", genesis.hash_hex());
                Ok(Ledger {
                    head: RwLock::new(genesis.hash.to_vec()),
                    store,
                })
            }
        }
    }

    /// Mine and admit a new block carrying `payload`, chained to the current
    /// head, at the ledger's fixed difficulty.
    pub fn append(&self, payload: &[u8]) -> Result<Block> {
        self.append_with(payload, &ProofOfWork::new())
    }

    /// Like [`Ledger::append`], with a caller-configured proof-of-work
    /// (progress reporting, cancellation).
    ///
    /// Mining runs outside any lock; the commit is a transactional
    /// compare-and-swap on the head pointer. If another append won the race
    /// meanwhile, the mined block is discarded, the cached head is refreshed,
    /// and [`LedgerError::StaleHead`] surfaces so the caller can retry against
    /// the new head. Either both the block record and the head pointer are
    /// written, or neither.
    pub fn append_with(&self, payload: &[u8], pow: &ProofOfWork) -> Result<Block> {
        let parent = self.head.read().clone();
        let candidate = Candidate::new(payload.to_vec(), parent.clone());
        let block = pow.mine(candidate)?;

        match self
            .store
            .commit_block(&block.hash, &block.encode(), Some(parent.as_slice()))
        {
            Ok(()) => {
                *self.head.write() = block.hash.to_vec();
                debug!(
                    "Appended block {} (prev = {}, nonce = {})",
                    block.hash_hex(),
                    block.prev_hash_hex(),
                    block.nonce
                );
                Ok(block)
            }
            Err(err @ LedgerError::StaleHead(_)) => {
                if let Some(current) = self.store.head()? {
                    *self.head.write() = current;
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Hash of the most recently admitted block.
    pub fn head(&self) -> Vec<u8> {
        self.head.read().clone()
    }

    /// Fetch and decode the block stored under `hash`.
    pub fn get_block(&self, hash: &[u8]) -> Result<Block> {
        let bytes = self.store.get_block(hash)?;
        Block::decode(&bytes)
    }

    /// Snapshot cursor from the current head back to genesis. One-shot; a
    /// fresh iterator is needed for each traversal.
    pub fn iter(&self) -> LedgerIterator<'_> {
        LedgerIterator {
            cursor: self.head(),
            store: self.store.as_ref(),
        }
    }

    /// Walk the whole chain from head to genesis, re-checking the proof of
    /// work and stored-hash consistency of every block. Returns the number of
    /// blocks on success, or the first integrity failure.
    pub fn verify_chain(&self) -> Result<u64> {
        let pow = ProofOfWork::new();
        let mut count = 0u64;
        for block in self.iter() {
            pow.check(&block?)?;
            count += 1;
        }
        Ok(count)
    }
}

/// Read-only cursor walking the chain newest-to-oldest.
pub struct LedgerIterator<'a> {
    cursor: Vec<u8>,
    store: &'a dyn BlockStore,
}

impl LedgerIterator<'_> {
    /// True until genesis has been yielded.
    pub fn has_next(&self) -> bool {
        !self.cursor.is_empty()
    }

    /// Yield the block at the cursor and advance to its predecessor.
    ///
    /// A missing block is structural corruption (every reachable hash must
    /// exist) and surfaces as [`LedgerError::NotFound`].
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        if self.cursor.is_empty() {
            return Ok(None);
        }
        let bytes = self.store.get_block(&self.cursor)?;
        let block = Block::decode(&bytes)?;
        self.cursor = block.prev_hash.clone();
        Ok(Some(block))
    }
}

impl Iterator for LedgerIterator<'_> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}
