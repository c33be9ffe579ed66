//! Donation service: the two operations a transport layer calls.
//!
//! - `submit_donation`: validate raw fields, stamp the identifier, append.
//! - `read_chain`: snapshot of every block for serialization.
//!
//! The service holds an injected `Arc<Ledger>`; several services (or handler
//! tasks) can share one ledger.

use crate::block::Block;
use crate::ledger::{Ledger, LedgerError};
use crate::ledger_config::{ConfigError, DuplicateUnitPolicy, LedgerConfig};
use crate::record::{DonationRecord, DonationSubmission, RecordError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DonationService {
    ledger: Arc<Ledger>,
    config: LedgerConfig,
}

impl DonationService {
    /// Wraps `ledger`, rejecting an invalid `config` up front.
    pub fn new(ledger: Arc<Ledger>, config: LedgerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { ledger, config })
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Validates `submission`, assigns its `unit_id` and appends it to the ledger.
    ///
    /// Returns the stored record on success. Input is checked before any
    /// hashing; a rejected append leaves the ledger untouched and is reported
    /// as `SubmitError::Rejected`.
    pub fn submit_donation(
        &self,
        submission: DonationSubmission,
    ) -> Result<DonationRecord, SubmitError> {
        let record = submission.into_record(self.config.max_field_len).map_err(|e| {
            tracing::warn!(error = %e, "malformed donation submission");
            e
        })?;
        let block = match self.config.duplicate_units {
            DuplicateUnitPolicy::Allow => self.ledger.append(record)?,
            DuplicateUnitPolicy::Reject => self.ledger.append_unique(record)?,
        };
        Ok(block.payload)
    }

    /// Read-only copy of the whole chain, genesis first.
    pub fn read_chain(&self) -> Vec<Block> {
        self.ledger.snapshot()
    }

    /// Full integrity audit of the underlying ledger.
    pub fn verify_chain(&self) -> Result<(), LedgerError> {
        self.ledger.verify_chain()
    }
}

/// Errors returned by `DonationService::submit_donation`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The submission failed field checks; no identifier or block was produced.
    #[error("malformed input: {0}")]
    MalformedInput(#[from] RecordError),

    /// The ledger refused the append.
    #[error(transparent)]
    Rejected(#[from] LedgerError),
}
