//! Donation records, their identifier, and validation of raw submissions.
//!
//! A `DonationSubmission` is what a caller hands in: every field is still a raw
//! string. `DonationSubmission::into_record` checks it and produces a
//! `DonationRecord` stamped with its `unit_id`, which is a pure function of
//! (donor, blood type, donation date). Status and recipient do not take part,
//! so two submissions that differ only there share an identifier.
//!
//! `DonationRecord::canonical_bytes` is the payload encoding fed into block
//! digests; its field order is fixed.

use crate::ledger_definition as definitions;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// ABO/Rh blood group of a donated unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodType {
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
}

impl BloodType {
    pub const ALL: [BloodType; 8] = [
        BloodType::OPositive,
        BloodType::ONegative,
        BloodType::APositive,
        BloodType::ANegative,
        BloodType::BPositive,
        BloodType::BNegative,
        BloodType::AbPositive,
        BloodType::AbNegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodType::OPositive => "O+",
            BloodType::ONegative => "O-",
            BloodType::APositive => "A+",
            BloodType::ANegative => "A-",
            BloodType::BPositive => "B+",
            BloodType::BNegative => "B-",
            BloodType::AbPositive => "AB+",
            BloodType::AbNegative => "AB-",
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BloodType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RecordError::UnknownBloodType(s.to_string()))
    }
}

/// Lifecycle state of a donated unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DonationStatus {
    Donated,
    Stored,
    Used,
    Expired,
}

impl DonationStatus {
    pub const ALL: [DonationStatus; 4] = [
        DonationStatus::Donated,
        DonationStatus::Stored,
        DonationStatus::Used,
        DonationStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Donated => "Donated",
            DonationStatus::Stored => "Stored",
            DonationStatus::Used => "Used",
            DonationStatus::Expired => "Expired",
        }
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DonationStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DonationStatus::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RecordError::UnknownStatus(s.to_string()))
    }
}

/// Derive the durable identifier of a donation as 64 lowercase hex characters.
pub fn generate_unit_id(donor_id: &str, blood_type: &str, donation_date: &str) -> String {
    hex::encode(definitions::COMPUTE_UNIT_ID(donor_id, blood_type, donation_date))
}

/// One blood donation as stored in a block.
///
/// Only the genesis sentinel has `blood_type`/`status` unset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecord {
    pub unit_id: String,
    pub donor_id: String,
    pub blood_type: Option<BloodType>,
    pub donation_date: String,
    pub expiry_date: String,
    pub status: Option<DonationStatus>,
    pub recipient_id: Option<String>,
    #[serde(rename = "isgenesis")]
    pub is_genesis: bool,
}

impl DonationRecord {
    /// The sentinel payload of block 0.
    pub fn genesis() -> Self {
        DonationRecord {
            is_genesis: true,
            ..Default::default()
        }
    }

    /// Recompute the identifier from this record's own donor/type/date fields.
    pub fn expected_unit_id(&self) -> String {
        let blood_type = self.blood_type.map(|t| t.as_str()).unwrap_or("");
        generate_unit_id(&self.donor_id, blood_type, &self.donation_date)
    }

    /// Stable byte encoding of every field, used as the block digest payload.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let recipient: Vec<u8> = match &self.recipient_id {
            Some(r) => [&[1u8][..], r.as_bytes()].concat(),
            None => vec![0u8],
        };
        definitions::CANONICAL_FIELDS(&[
            ("unit_id", self.unit_id.as_bytes()),
            ("donor_id", self.donor_id.as_bytes()),
            ("blood_type", self.blood_type.map(|t| t.as_str()).unwrap_or("").as_bytes()),
            ("donation_date", self.donation_date.as_bytes()),
            ("expiry_date", self.expiry_date.as_bytes()),
            ("status", self.status.map(|s| s.as_str()).unwrap_or("").as_bytes()),
            ("recipient_id", &recipient),
            ("isgenesis", &[u8::from(self.is_genesis)]),
        ])
    }
}

/// Raw donation fields as received from a caller.
///
/// Missing JSON fields deserialize to empty strings so that they are reported
/// as `RecordError::MissingField` rather than as a decoding failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DonationSubmission {
    pub donor_id: String,
    pub blood_type: String,
    pub donation_date: String,
    pub expiry_date: String,
    pub status: String,
    pub recipient_id: Option<String>,
}

impl DonationSubmission {
    /// Validate every field and build the identified record.
    ///
    /// Checks run before any hashing: required fields present, lengths within
    /// `max_field_len`, blood type and status from their enumerations, dates in
    /// `YYYY-MM-DD` form, expiry not before donation. Values are never trimmed:
    /// leading or trailing whitespace is rejected. An empty `recipient_id` is
    /// treated as absent.
    pub fn into_record(self, max_field_len: usize) -> Result<DonationRecord, RecordError> {
        let donor_id = required("donor_id", self.donor_id, max_field_len)?;
        let blood_type: BloodType = required("blood_type", self.blood_type, max_field_len)?.parse()?;
        let donation_date = required("donation_date", self.donation_date, max_field_len)?;
        let expiry_date = required("expiry_date", self.expiry_date, max_field_len)?;
        let status: DonationStatus = required("status", self.status, max_field_len)?.parse()?;

        let donated_on = parse_date("donation_date", &donation_date)?;
        let expires_on = parse_date("expiry_date", &expiry_date)?;
        if expires_on < donated_on {
            return Err(RecordError::ExpiryBeforeDonation { donation_date, expiry_date });
        }

        let recipient_id = match self.recipient_id {
            Some(r) if r.is_empty() => None,
            Some(r) => Some(check_text("recipient_id", r, max_field_len)?),
            None => None,
        };

        let unit_id = generate_unit_id(&donor_id, blood_type.as_str(), &donation_date);
        Ok(DonationRecord {
            unit_id,
            donor_id,
            blood_type: Some(blood_type),
            donation_date,
            expiry_date,
            status: Some(status),
            recipient_id,
            is_genesis: false,
        })
    }
}

fn required(field: &'static str, value: String, max: usize) -> Result<String, RecordError> {
    if value.trim().is_empty() {
        return Err(RecordError::MissingField { field });
    }
    check_text(field, value, max)
}

fn check_text(field: &'static str, value: String, max: usize) -> Result<String, RecordError> {
    if value.trim() != value {
        return Err(RecordError::SurroundingWhitespace { field });
    }
    if value.len() > max {
        return Err(RecordError::FieldTooLong { field, max, actual: value.len() });
    }
    Ok(value)
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, RecordError> {
    let invalid = || RecordError::InvalidDate { field, value: value.to_string() };
    let date = NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid())?;
    // Reject non-canonical spellings such as "2024-1-1".
    if date.format(DATE_FORMAT).to_string() != value {
        return Err(invalid());
    }
    Ok(date)
}

/// Errors raised while turning a submission into a record (malformed input).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// A required field was absent or blank.
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    /// A field exceeded the configured length limit.
    #[error("field `{field}` is {actual} bytes, limit is {max}")]
    FieldTooLong { field: &'static str, max: usize, actual: usize },

    /// A value had leading or trailing whitespace; it would change the identifier.
    #[error("field `{field}` has leading or trailing whitespace")]
    SurroundingWhitespace { field: &'static str },

    #[error("unknown blood type `{0}`")]
    UnknownBloodType(String),

    #[error("unknown donation status `{0}`")]
    UnknownStatus(String),

    /// A date was not a valid `YYYY-MM-DD` calendar date.
    #[error("field `{field}` is not a YYYY-MM-DD date: `{value}`")]
    InvalidDate { field: &'static str, value: String },

    #[error("expiry date {expiry_date} precedes donation date {donation_date}")]
    ExpiryBeforeDonation { donation_date: String, expiry_date: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> DonationSubmission {
        DonationSubmission {
            donor_id: "D1".into(),
            blood_type: "O+".into(),
            donation_date: "2024-01-01".into(),
            expiry_date: "2024-02-12".into(),
            status: "Donated".into(),
            recipient_id: None,
        }
    }

    #[test]
    fn valid_submission_gets_derived_unit_id() {
        let rec = submission().into_record(128).unwrap();
        assert_eq!(rec.unit_id, generate_unit_id("D1", "O+", "2024-01-01"));
        assert_eq!(rec.unit_id.len(), 64);
        assert_eq!(rec.unit_id, rec.expected_unit_id());
        assert_eq!(rec.blood_type, Some(BloodType::OPositive));
        assert_eq!(rec.status, Some(DonationStatus::Donated));
        assert!(!rec.is_genesis);
    }

    #[test]
    fn unit_id_ignores_status_and_recipient() {
        let a = submission().into_record(128).unwrap();
        let mut s = submission();
        s.status = "Used".into();
        s.recipient_id = Some("R7".into());
        let b = s.into_record(128).unwrap();
        assert_eq!(a.unit_id, b.unit_id);
        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn missing_fields_are_reported_by_name() {
        let mut s = submission();
        s.donor_id = "  ".into();
        assert_eq!(
            s.into_record(128).unwrap_err(),
            RecordError::MissingField { field: "donor_id" }
        );

        let s: DonationSubmission = serde_json::from_str(r#"{"donor_id":"D1"}"#).unwrap();
        assert_eq!(
            s.into_record(128).unwrap_err(),
            RecordError::MissingField { field: "blood_type" }
        );
    }

    #[test]
    fn enumerated_values_are_not_coerced() {
        let mut s = submission();
        s.blood_type = "o+".into();
        assert_eq!(
            s.into_record(128).unwrap_err(),
            RecordError::UnknownBloodType("o+".into())
        );

        let mut s = submission();
        s.status = "Lost".into();
        assert_eq!(s.into_record(128).unwrap_err(), RecordError::UnknownStatus("Lost".into()));
    }

    #[test]
    fn dates_must_be_canonical_and_ordered() {
        let mut s = submission();
        s.donation_date = "2024-1-1".into();
        assert!(matches!(
            s.into_record(128).unwrap_err(),
            RecordError::InvalidDate { field: "donation_date", .. }
        ));

        let mut s = submission();
        s.expiry_date = "2024-02-30".into();
        assert!(matches!(
            s.into_record(128).unwrap_err(),
            RecordError::InvalidDate { field: "expiry_date", .. }
        ));

        let mut s = submission();
        s.expiry_date = "2023-12-31".into();
        assert!(matches!(
            s.into_record(128).unwrap_err(),
            RecordError::ExpiryBeforeDonation { .. }
        ));
    }

    #[test]
    fn long_fields_rejected() {
        let mut s = submission();
        s.recipient_id = Some("R".repeat(11));
        assert_eq!(
            s.into_record(10).unwrap_err(),
            RecordError::FieldTooLong { field: "recipient_id", max: 10, actual: 11 }
        );
    }

    #[test]
    fn surrounding_whitespace_is_rejected_not_trimmed() {
        let mut s = submission();
        s.donor_id = " D1".into();
        assert_eq!(
            s.into_record(128).unwrap_err(),
            RecordError::SurroundingWhitespace { field: "donor_id" }
        );

        let mut s = submission();
        s.donation_date = "2024-01-01 ".into();
        assert_eq!(
            s.into_record(128).unwrap_err(),
            RecordError::SurroundingWhitespace { field: "donation_date" }
        );

        let mut s = submission();
        s.recipient_id = Some("R1\n".into());
        assert_eq!(
            s.into_record(128).unwrap_err(),
            RecordError::SurroundingWhitespace { field: "recipient_id" }
        );

        let mut s = submission();
        s.recipient_id = Some("  ".into());
        assert_eq!(
            s.into_record(128).unwrap_err(),
            RecordError::SurroundingWhitespace { field: "recipient_id" }
        );
    }

    #[test]
    fn empty_recipient_is_absent() {
        let mut s = submission();
        s.recipient_id = Some(String::new());
        assert_eq!(s.into_record(128).unwrap().recipient_id, None);
    }

    #[test]
    fn canonical_bytes_distinguish_absent_and_empty_recipient() {
        let mut a = DonationRecord::genesis();
        let mut b = DonationRecord::genesis();
        a.recipient_id = None;
        b.recipient_id = Some(String::new());
        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn record_json_uses_wire_names() {
        let rec = submission().into_record(128).unwrap();
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["blood_type"], "O+");
        assert_eq!(v["status"], "Donated");
        assert_eq!(v["isgenesis"], false);
        assert!(v["unit_id"].is_string());
        let back: DonationRecord = serde_json::from_value(v).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn genesis_record_is_flagged() {
        let g = DonationRecord::genesis();
        assert!(g.is_genesis);
        assert!(g.unit_id.is_empty());
        assert_eq!(g.blood_type, None);
    }
}
