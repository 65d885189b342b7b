//! Block entity and its persisted binary encoding.
//!
//! A block binds an opaque payload to the hash of its predecessor and carries
//! the nonce found by the proof-of-work search. The block hash doubles as its
//! storage key.
//!
//! Persisted layout (all integers big-endian):
//!
//! ```text
//! ┌──────────────┬───────────┬──────────────┬─────────┬───────┬──────┐
//! │ prev_len u32 │ prev_hash │ payload_len  │ payload │ nonce │ hash │
//! │              │ (var)     │ u32          │ (var)   │ u64   │ 32 B │
//! └──────────────┴───────────┴──────────────┴─────────┴───────┴──────┘
//! ```
//!
//! Field order matches the mining preimage; the difficulty constant is part of
//! the preimage but is not stored.

use crate::error::{LedgerError, Result};

pub type BlockHash = [u8; 32];

/// Payload of the unique first block.
pub const GENESIS_PAYLOAD: &[u8] = b"Genesis";

/// An unmined block shell: everything except the proof.
///
/// Candidates are consumed by [`crate::pow::ProofOfWork::mine`], which finds
/// the nonce and seals the result into an immutable [`Block`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub payload: Vec<u8>,
    pub prev_hash: Vec<u8>,
}

impl Candidate {
    pub fn new(payload: Vec<u8>, prev_hash: Vec<u8>) -> Self {
        Candidate { payload, prev_hash }
    }

    /// Candidate for the unique first block: well-known payload, no predecessor.
    pub fn genesis() -> Self {
        Candidate {
            payload: GENESIS_PAYLOAD.to_vec(),
            prev_hash: Vec::new(),
        }
    }

    /// Seal the candidate with a proof found by mining.
    pub fn finalize(self, nonce: u64, hash: BlockHash) -> Block {
        Block {
            payload: self.payload,
            prev_hash: self.prev_hash,
            nonce,
            hash,
        }
    }
}

/// An admitted ledger record. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub payload: Vec<u8>,
    pub prev_hash: Vec<u8>,
    pub nonce: u64,
    pub hash: BlockHash,
}

impl Block {
    /// True for the unique first block, whose `prev_hash` is empty.
    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn prev_hash_hex(&self) -> String {
        hex::encode(&self.prev_hash)
    }

    /// Encode the block into its persisted byte form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf =
            Vec::with_capacity(4 + self.prev_hash.len() + 4 + self.payload.len() + 8 + 32);
        buf.extend_from_slice(&(self.prev_hash.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.prev_hash);
        buf.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        buf.extend_from_slice(&self.hash);
        buf
    }

    /// Decode a block from its persisted byte form.
    ///
    /// Rejects truncated buffers, oversized length prefixes, and trailing
    /// bytes. A block that decodes cleanly is structurally sound but not yet
    /// trusted; proof and hash consistency are checked separately.
    pub fn decode(bytes: &[u8]) -> Result<Block> {
        let mut cursor = Cursor::new(bytes);

        let prev_len = cursor.read_u32_be()? as usize;
        let prev_hash = cursor.read_bytes(prev_len, "previous hash")?.to_vec();
        let payload_len = cursor.read_u32_be()? as usize;
        let payload = cursor.read_bytes(payload_len, "payload")?.to_vec();
        let nonce = cursor.read_u64_be()?;
        let hash_bytes = cursor.read_bytes(32, "block hash")?;

        let hash: BlockHash = hash_bytes
            .try_into()
            .map_err(|_| LedgerError::Decode("block hash is not 32 bytes".to_string()))?;

        if cursor.remaining() != 0 {
            return Err(LedgerError::Decode(format!(
                "{} trailing bytes after block",
                cursor.remaining()
            )));
        }

        Ok(Block {
            payload,
            prev_hash,
            nonce,
            hash,
        })
    }
}

/// Minimal bounds-checked reader over the persisted form.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn read_bytes(&mut self, len: usize, field: &str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(LedgerError::Decode(format!(
                "truncated buffer: need {} bytes for {}, have {}",
                len,
                field,
                self.remaining()
            )));
        }
        let out = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn read_u32_be(&mut self) -> Result<u32> {
        let b = self.read_bytes(4, "length prefix")?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64_be(&mut self) -> Result<u64> {
        let b = self.read_bytes(8, "nonce")?;
        Ok(u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block {
            payload: b"some payload".to_vec(),
            prev_hash: vec![0xAB; 32],
            nonce: 42,
            hash: [0xCD; 32],
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let block = sample_block();
        let decoded = Block::decode(&block.encode()).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_genesis_roundtrip() {
        let block = Candidate::genesis().finalize(7, [0x11; 32]);
        assert!(block.is_genesis());
        assert_eq!(block.payload, GENESIS_PAYLOAD);

        let decoded = Block::decode(&block.encode()).unwrap();
        assert_eq!(decoded, block);
        assert!(decoded.is_genesis());
    }

    #[test]
    fn test_empty_payload_roundtrip() {
        let block = Candidate::new(Vec::new(), vec![1; 32]).finalize(0, [0; 32]);
        let decoded = Block::decode(&block.encode()).unwrap();
        assert_eq!(decoded, block);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_decode_truncated_buffer() {
        let encoded = sample_block().encode();
        let result = Block::decode(&encoded[..encoded.len() - 1]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("truncated buffer"));
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut encoded = sample_block().encode();
        encoded.push(0);
        let result = Block::decode(&encoded);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("trailing bytes"));
    }

    #[test]
    fn test_decode_oversized_length_prefix() {
        // A length prefix larger than the whole buffer must not be trusted.
        let mut encoded = Vec::new();
        encoded.extend_from_slice(&u32::MAX.to_be_bytes());
        encoded.extend_from_slice(&[0u8; 16]);
        let result = Block::decode(&encoded);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_empty_buffer() {
        assert!(Block::decode(&[]).is_err());
    }

    #[test]
    fn test_candidate_finalize_preserves_fields() {
        let candidate = Candidate::new(b"data".to_vec(), vec![9; 32]);
        let block = candidate.clone().finalize(1234, [5; 32]);
        assert_eq!(block.payload, candidate.payload);
        assert_eq!(block.prev_hash, candidate.prev_hash);
        assert_eq!(block.nonce, 1234);
        assert_eq!(block.hash, [5; 32]);
    }
}
