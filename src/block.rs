//! Ledger block: one donation record plus position, timestamp and hash linkage.
//!
//! The stored `hash` always covers `(position, timestamp, payload, prev_hash)`
//! in that order via `COMPUTE_BLOCK_HASH`, so any later change to a stored field
//! is visible to `verify_hash`. `validate_successor_of` is the pairwise check the
//! ledger applies on append and during audits.
//!
//! Field names on the wire are `pos`, `data`, `hash`, `time`, `prevhash`.

use crate::ledger_definition::{self as definitions, Hash32};
use crate::record::DonationRecord;
use crate::serde_hex::encode_prefixed;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single hash-linked entry of the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Index in the chain; the genesis block is 0.
    #[serde(rename = "pos")]
    pub position: u64,
    #[serde(rename = "data")]
    pub payload: DonationRecord,
    /// SHA-256 digest of this block, serialized as `0x` hex.
    #[serde(with = "crate::serde_hex::hex32")]
    pub hash: Hash32,
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,
    /// Hash of the preceding block; `None` only for genesis (serialized as `""`).
    #[serde(rename = "prevhash", with = "crate::serde_hex::opt_hex32")]
    pub prev_hash: Option<Hash32>,
}

impl Block {
    /// Genesis block stamped with the current time.
    pub fn genesis() -> Self {
        Self::genesis_at(Utc::now())
    }

    pub fn genesis_at(timestamp: DateTime<Utc>) -> Self {
        Self::sealed(0, DonationRecord::genesis(), timestamp, None)
    }

    /// Build the block following `previous`, stamped with the current time.
    ///
    /// The result is not part of any ledger until accepted by `Ledger::append_block`.
    pub fn create(previous: &Block, payload: DonationRecord) -> Self {
        Self::create_at(previous, payload, Utc::now())
    }

    pub fn create_at(previous: &Block, payload: DonationRecord, timestamp: DateTime<Utc>) -> Self {
        let block = Self::sealed(
            previous.position.saturating_add(1),
            payload,
            timestamp,
            Some(previous.hash),
        );
        tracing::debug!(
            position = block.position,
            unit_id = %block.payload.unit_id,
            hash = %block.hash_hex(),
            "built candidate block"
        );
        block
    }

    fn sealed(
        position: u64,
        payload: DonationRecord,
        timestamp: DateTime<Utc>,
        prev_hash: Option<Hash32>,
    ) -> Self {
        let mut block = Block {
            position,
            payload,
            hash: [0u8; 32],
            timestamp,
            prev_hash,
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Recomputes the digest from the stored fields.
    pub fn calculate_hash(&self) -> Hash32 {
        definitions::COMPUTE_BLOCK_HASH(
            self.position,
            &definitions::CANONICAL_TIMESTAMP(&self.timestamp),
            &self.payload.canonical_bytes(),
            self.prev_hash.as_ref(),
        )
    }

    pub fn hash_hex(&self) -> String {
        encode_prefixed(&self.hash)
    }

    /// Checks that the stored hash matches the stored fields.
    pub fn verify_hash(&self) -> Result<(), BlockError> {
        let calculated = self.calculate_hash();
        if calculated != self.hash {
            return Err(BlockError::HashMismatch {
                position: self.position,
                stored: self.hash,
                calculated,
            });
        }
        Ok(())
    }

    /// Validates `self` as the direct successor of `previous`.
    ///
    /// Checks, in order:
    /// - `prev_hash` equals `previous.hash`.
    /// - The stored hash recomputes from the stored fields.
    /// - `position` is exactly `previous.position + 1`.
    /// - The payload is a donation record (`validate_record`).
    pub fn validate_successor_of(&self, previous: &Block) -> Result<(), BlockError> {
        if self.prev_hash != Some(previous.hash) {
            return Err(BlockError::LinkageMismatch {
                position: self.position,
                expected: previous.hash,
                found: self.prev_hash,
            });
        }
        self.verify_hash()?;
        match previous.position.checked_add(1) {
            Some(expected) if expected == self.position => {}
            _ => {
                return Err(BlockError::PositionMismatch {
                    expected: previous.position.saturating_add(1),
                    found: self.position,
                });
            }
        }
        self.validate_record()
    }

    /// Checks the payload of a non-genesis block.
    ///
    /// It must not carry the genesis flag, must have a blood type and status,
    /// and its `unit_id` must derive from its own donor, blood type and date.
    pub fn validate_record(&self) -> Result<(), BlockError> {
        let record = &self.payload;
        let reason = if record.is_genesis {
            "genesis record outside position 0"
        } else if record.blood_type.is_none() {
            "missing blood type"
        } else if record.status.is_none() {
            "missing status"
        } else if record.unit_id != record.expected_unit_id() {
            "unit_id is not derived from donor, blood type and donation date"
        } else {
            return Ok(());
        };
        Err(BlockError::RecordMismatch {
            position: self.position,
            reason,
        })
    }

    /// Validates `self` as the first block of a chain.
    pub fn validate_genesis(&self) -> Result<(), BlockError> {
        if self.position != 0 {
            return Err(BlockError::NotGenesis { reason: "position is not 0" });
        }
        if self.prev_hash.is_some() {
            return Err(BlockError::NotGenesis { reason: "previous hash is set" });
        }
        if !self.payload.is_genesis {
            return Err(BlockError::NotGenesis { reason: "payload is not the genesis record" });
        }
        self.verify_hash()
    }
}

fn fmt_prev(prev: &Option<Hash32>) -> String {
    prev.as_ref().map(|h| encode_prefixed(h)).unwrap_or_else(|| "<none>".to_string())
}

/// Reasons a block fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// `prev_hash` does not point at the preceding block.
    #[error(
        "block {position}: prev_hash {} does not match preceding hash {}",
        fmt_prev(.found),
        encode_prefixed(.expected)
    )]
    LinkageMismatch { position: u64, expected: Hash32, found: Option<Hash32> },

    /// The stored hash does not match the stored fields.
    #[error(
        "block {position}: stored hash {} != calculated {}",
        encode_prefixed(.stored),
        encode_prefixed(.calculated)
    )]
    HashMismatch { position: u64, stored: Hash32, calculated: Hash32 },

    /// The position does not directly follow the preceding block.
    #[error("position mismatch: expected {expected}, found {found}")]
    PositionMismatch { expected: u64, found: u64 },

    #[error("not a genesis block: {reason}")]
    NotGenesis { reason: &'static str },

    /// The payload breaks a donation record invariant.
    #[error("block {position}: invalid record: {reason}")]
    RecordMismatch { position: u64, reason: &'static str },
}
