//! The append-only donation ledger.
//!
//! `Ledger` owns the block sequence behind a single `RwLock`. Appends hold the
//! write lock across read-last, build, validate and push, so they are serialized
//! and readers never see a half-linked block. Readers get clones.
//!
//! Index 0 is always a genesis block. `verify_chain`/`verify_blocks` re-walk the
//! whole sequence and report the first offending position.

use crate::block::{Block, BlockError};
use crate::record::DonationRecord;
use parking_lot::RwLock;
use thiserror::Error;

/// Ordered, hash-linked sequence of blocks.
#[derive(Debug)]
pub struct Ledger {
    blocks: RwLock<Vec<Block>>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Creates a ledger holding only a fresh genesis block.
    pub fn new() -> Self {
        let genesis = Block::genesis();
        tracing::info!(hash = %genesis.hash_hex(), "created ledger with genesis block");
        Self {
            blocks: RwLock::new(vec![genesis]),
        }
    }

    /// Rehydrates a ledger from previously persisted blocks.
    ///
    /// The whole sequence is verified first; a corrupted sequence is refused
    /// outright rather than partially loaded.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, LedgerError> {
        if let Err(e) = verify_blocks(&blocks) {
            tracing::warn!(error = %e, blocks = blocks.len(), "refusing to load ledger");
            return Err(e);
        }
        tracing::info!(blocks = blocks.len(), "loaded verified ledger");
        Ok(Self {
            blocks: RwLock::new(blocks),
        })
    }

    /// Appends `record` as the next block and returns the accepted block.
    pub fn append(&self, record: DonationRecord) -> Result<Block, LedgerError> {
        let mut chain = self.blocks.write();
        extend(&mut chain, record)
    }

    /// Like `append`, but refuses a record whose `unit_id` is already on the chain.
    ///
    /// The lookup and the append happen under the same write lock.
    pub fn append_unique(&self, record: DonationRecord) -> Result<Block, LedgerError> {
        let mut chain = self.blocks.write();
        if let Some(existing) = chain
            .iter()
            .find(|b| !b.payload.is_genesis && b.payload.unit_id == record.unit_id)
        {
            tracing::warn!(
                unit_id = %record.unit_id,
                position = existing.position,
                "rejected duplicate unit"
            );
            return Err(LedgerError::DuplicateUnit {
                unit_id: record.unit_id,
                position: existing.position,
            });
        }
        extend(&mut chain, record)
    }

    /// Validates an externally built block against the current last block and appends it.
    pub fn append_block(&self, candidate: Block) -> Result<(), LedgerError> {
        let mut chain = self.blocks.write();
        push_validated(&mut chain, candidate)
    }

    /// Re-verifies every block from genesis forward.
    pub fn verify_chain(&self) -> Result<(), LedgerError> {
        let chain = self.blocks.read();
        let result = verify_blocks(&chain);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "ledger audit failed");
        }
        result
    }

    pub fn is_valid(&self) -> bool {
        self.verify_chain().is_ok()
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Always false for a ledger built through `new` or `from_blocks`.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    pub fn last_block(&self) -> Option<Block> {
        self.blocks.read().last().cloned()
    }

    pub fn get(&self, position: u64) -> Option<Block> {
        let index = usize::try_from(position).ok()?;
        self.blocks.read().get(index).cloned()
    }

    /// Copy of the full chain, genesis first.
    pub fn snapshot(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }
}

fn extend(chain: &mut Vec<Block>, record: DonationRecord) -> Result<Block, LedgerError> {
    let previous = chain.last().ok_or(LedgerError::MissingGenesis)?;
    let candidate = Block::create(previous, record);
    push_validated(chain, candidate.clone())?;
    Ok(candidate)
}

fn push_validated(chain: &mut Vec<Block>, candidate: Block) -> Result<(), LedgerError> {
    let previous = chain.last().ok_or(LedgerError::MissingGenesis)?;
    if let Err(source) = candidate.validate_successor_of(previous) {
        tracing::warn!(position = candidate.position, error = %source, "rejected block append");
        return Err(LedgerError::ChainLinkageViolation {
            position: candidate.position,
            source,
        });
    }
    tracing::info!(
        position = candidate.position,
        unit_id = %candidate.payload.unit_id,
        hash = %candidate.hash_hex(),
        "appended block"
    );
    chain.push(candidate);
    Ok(())
}

/// Verifies a block sequence: a valid genesis at index 0, then every pair in order.
///
/// Returns `IntegrityFailure` carrying the index of the first offending block.
pub fn verify_blocks(blocks: &[Block]) -> Result<(), LedgerError> {
    let genesis = blocks.first().ok_or(LedgerError::MissingGenesis)?;
    genesis
        .validate_genesis()
        .map_err(|source| LedgerError::IntegrityFailure { position: 0, source })?;
    for (i, pair) in blocks.windows(2).enumerate() {
        pair[1]
            .validate_successor_of(&pair[0])
            .map_err(|source| LedgerError::IntegrityFailure {
                position: i as u64 + 1,
                source,
            })?;
    }
    Ok(())
}

/// Errors returned by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A candidate block did not validate against the current last block; nothing was appended.
    #[error("append rejected for block {position}")]
    ChainLinkageViolation { position: u64, source: BlockError },

    /// An audit found the block at `position` broken; the sequence must not be trusted.
    #[error("integrity failure at position {position}")]
    IntegrityFailure { position: u64, source: BlockError },

    #[error("ledger has no genesis block")]
    MissingGenesis,

    #[error("unit {unit_id} is already recorded at position {position}")]
    DuplicateUnit { unit_id: String, position: u64 },
}
