//! blood-ledger crate library entry point.
//!
//! An append-only, hash-chained ledger of blood donation records. Each block
//! commits to its predecessor's SHA-256 digest, so editing any accepted block
//! breaks the chain from that position on.
//!
//! Modules:
//! - `serde_hex`: Serde helpers encoding digests as 0x-prefixed hex.
//! - `ledger_definition`: CAPITALIZED hash functions (block digest, unit identifier, canonical encoding).
//! - `record`: donation records, submissions and their validation.
//! - `ledger_config`: service configuration.
//! - `block`, `ledger`: chain types with construction and integrity checks.
//! - `service`: the submit/read interface a transport layer calls.

pub mod serde_hex;
pub mod ledger_definition;
pub mod record;
pub mod ledger_config;
pub mod block;
pub mod ledger;
pub mod service;

pub use block::{Block, BlockError};
pub use ledger::{Ledger, LedgerError, verify_blocks};
pub use ledger_config::{ConfigError, DuplicateUnitPolicy, LedgerConfig};
pub use record::{
    BloodType, DonationRecord, DonationStatus, DonationSubmission, RecordError, generate_unit_id,
};
pub use service::{DonationService, SubmitError};
