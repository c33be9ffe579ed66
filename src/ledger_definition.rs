//! CAPITALIZED ledger functions and hashing domains.
//!
//! This module centralizes the pure functions the ledger types are built on so
//! that construction and validation always recompute digests the same way.
//!
//! Contents:
//! - Domain constants used for SHA-256 domain separation
//! - `CANONICAL_FIELDS`: length-framed, labelled field encoding
//! - `CANONICAL_TIMESTAMP`: the one timestamp rendering fed into digests
//! - `COMPUTE_BLOCK_HASH`: the chain digest over (position, timestamp, payload, prev_hash)
//! - `COMPUTE_UNIT_ID`: the donation identifier digest over (donor, blood type, date)
//!
//! Every variable-length input is framed with its length as u64 little-endian,
//! so moving bytes between adjacent fields always changes the digest.

#![allow(non_snake_case)]

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

/// 32-byte hash type used across the ledger.
pub type Hash32 = [u8; 32];

/// Domain separation for block digests.
pub const BLOCK_HASH_DOMAIN: &[u8] = b"blood-ledger:block:";
/// Domain separation for donation unit identifiers.
pub const UNIT_ID_DOMAIN: &[u8] = b"blood-ledger:unit_id:";

fn sha256_concat(parts: &[&[u8]]) -> Hash32 {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p);
    }
    hasher.finalize().into()
}

fn frame_len(bytes: &[u8]) -> [u8; 8] {
    (bytes.len() as u64).to_le_bytes()
}

/// Encode labelled fields as `label_len || label || value_len || value`, in the given order.
///
/// Callers must always pass fields in the same order; the encoding itself does
/// not sort.
pub fn CANONICAL_FIELDS(fields: &[(&str, &[u8])]) -> Vec<u8> {
    let size: usize = fields.iter().map(|(l, v)| 16 + l.len() + v.len()).sum();
    let mut out = Vec::with_capacity(size);
    for (label, value) in fields {
        out.extend_from_slice(&frame_len(label.as_bytes()));
        out.extend_from_slice(label.as_bytes());
        out.extend_from_slice(&frame_len(value));
        out.extend_from_slice(value);
    }
    out
}

/// Render a block timestamp for hashing: RFC 3339, nanosecond precision, `Z` suffix.
pub fn CANONICAL_TIMESTAMP(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Compute the digest of a block.
///
/// `SHA256(BLOCK_HASH_DOMAIN || position_le || framed(timestamp) || framed(payload) || framed(prev_hash))`
///
/// The genesis block has no previous hash and contributes an empty frame.
pub fn COMPUTE_BLOCK_HASH(
    position: u64,
    timestamp: &str,
    canonical_payload: &[u8],
    prev_hash: Option<&Hash32>,
) -> Hash32 {
    let pos = position.to_le_bytes();
    let prev: &[u8] = match prev_hash {
        Some(h) => h,
        None => &[],
    };
    sha256_concat(&[
        BLOCK_HASH_DOMAIN,
        &pos,
        &frame_len(timestamp.as_bytes()),
        timestamp.as_bytes(),
        &frame_len(canonical_payload),
        canonical_payload,
        &frame_len(prev),
        prev,
    ])
}

/// Compute the identifier digest of a donation.
///
/// `SHA256(UNIT_ID_DOMAIN || framed(donor_id) || framed(blood_type) || framed(donation_date))`
pub fn COMPUTE_UNIT_ID(donor_id: &str, blood_type: &str, donation_date: &str) -> Hash32 {
    sha256_concat(&[
        UNIT_ID_DOMAIN,
        &frame_len(donor_id.as_bytes()),
        donor_id.as_bytes(),
        &frame_len(blood_type.as_bytes()),
        blood_type.as_bytes(),
        &frame_len(donation_date.as_bytes()),
        donation_date.as_bytes(),
    ])
}
