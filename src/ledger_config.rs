//! Ledger configuration.
//!
//! `LedgerConfig` controls input limits and what happens when a submission
//! derives a `unit_id` that is already on the chain. It is plain data with serde
//! derives; reading it from a file or the environment is left to the embedding
//! process.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default upper bound on the byte length of any submitted field.
pub const DEFAULT_MAX_FIELD_LEN: usize = 128;

/// What to do with a submission whose `unit_id` already appears in the ledger.
///
/// The identifier depends only on donor, blood type and donation date, so two
/// donations by the same donor of the same type on the same day collide.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateUnitPolicy {
    /// Append anyway; the later block records the newer status/recipient for the same unit.
    #[default]
    Allow,
    /// Refuse the submission.
    Reject,
}

/// Configuration for the donation service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub duplicate_units: DuplicateUnitPolicy,
    /// Byte limit applied to every submitted string field.
    pub max_field_len: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            duplicate_units: DuplicateUnitPolicy::default(),
            max_field_len: DEFAULT_MAX_FIELD_LEN,
        }
    }
}

impl LedgerConfig {
    pub fn new(duplicate_units: DuplicateUnitPolicy, max_field_len: usize) -> Self {
        Self {
            duplicate_units,
            max_field_len,
        }
    }

    /// Validate the config.
    ///
    /// `max_field_len` must be non-zero and large enough for a `YYYY-MM-DD` date.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_field_len < MIN_FIELD_LEN {
            return Err(ConfigError::FieldLimitTooSmall {
                min: MIN_FIELD_LEN,
                found: self.max_field_len,
            });
        }
        Ok(())
    }
}

const MIN_FIELD_LEN: usize = "YYYY-MM-DD".len();

/// Errors that can be produced by configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_field_len must be at least {min}, found {found}")]
    FieldLimitTooSmall { min: usize, found: usize },
}
