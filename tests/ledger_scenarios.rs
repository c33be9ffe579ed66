//! End-to-end ledger scenarios through the public API.

use blood_ledger::{
    Block, BlockError, DonationService, DonationSubmission, DuplicateUnitPolicy, Ledger,
    LedgerConfig, LedgerError, SubmitError, generate_unit_id,
};
use std::sync::Arc;

fn submission(donor: &str, status: &str) -> DonationSubmission {
    DonationSubmission {
        donor_id: donor.into(),
        blood_type: "O+".into(),
        donation_date: "2024-01-01".into(),
        expiry_date: "2024-02-12".into(),
        status: status.into(),
        recipient_id: None,
    }
}

fn service() -> DonationService {
    DonationService::new(Arc::new(Ledger::new()), LedgerConfig::default()).unwrap()
}

#[test]
fn same_donation_event_twice() {
    let svc = service();
    let genesis = svc.read_chain().remove(0);
    assert_eq!(genesis.position, 0);
    assert_eq!(genesis.prev_hash, None);

    let first = svc.submit_donation(submission("D1", "Donated")).unwrap();
    assert_eq!(first.unit_id, generate_unit_id("D1", "O+", "2024-01-01"));
    let chain = svc.read_chain();
    assert_eq!(chain[1].position, 1);
    assert_eq!(chain[1].prev_hash, Some(genesis.hash));

    let second = svc.submit_donation(submission("D1", "Stored")).unwrap();
    assert_eq!(second.unit_id, first.unit_id);
    let chain = svc.read_chain();
    assert_eq!(chain.len(), 3);
    assert_eq!(chain[2].position, 2);
    assert_eq!(chain[2].prev_hash, Some(chain[1].hash));
    assert!(svc.verify_chain().is_ok());
}

#[test]
fn forged_block_claiming_position_five_is_rejected() {
    let ledger = Ledger::new();
    let genesis = ledger.get(0).unwrap();
    let record = submission("D1", "Donated").into_record(128).unwrap();

    let mut forged = Block::create(&genesis, record);
    forged.position = 5;
    forged.hash = forged.calculate_hash();
    assert_eq!(forged.prev_hash, Some(genesis.hash));

    let err = ledger.append_block(forged).unwrap_err();
    assert_eq!(
        err,
        LedgerError::ChainLinkageViolation {
            position: 5,
            source: BlockError::PositionMismatch { expected: 1, found: 5 },
        }
    );
    assert_eq!(ledger.len(), 1);
}

#[test]
fn rejected_duplicate_is_reported_to_caller() {
    let svc = DonationService::new(
        Arc::new(Ledger::new()),
        LedgerConfig::new(DuplicateUnitPolicy::Reject, 64),
    )
    .unwrap();
    svc.submit_donation(submission("D1", "Donated")).unwrap();
    let err = svc.submit_donation(submission("D1", "Used")).unwrap_err();
    assert!(matches!(err, SubmitError::Rejected(LedgerError::DuplicateUnit { .. })));
    assert!(err.to_string().contains("already recorded at position 1"));
}

#[test]
fn concurrent_submissions_are_serialized() {
    let svc = Arc::new(service());
    std::thread::scope(|s| {
        for t in 0..8 {
            let svc = Arc::clone(&svc);
            s.spawn(move || {
                for i in 0..10 {
                    svc.submit_donation(submission(&format!("T{t}-{i}"), "Donated")).unwrap();
                }
            });
        }
    });

    let chain = svc.read_chain();
    assert_eq!(chain.len(), 81);
    for (i, b) in chain.iter().enumerate() {
        assert_eq!(b.position, i as u64);
    }
    assert!(svc.verify_chain().is_ok());
}

#[test]
fn chain_json_reloads_and_detects_edits() {
    let svc = service();
    svc.submit_donation(submission("D1", "Donated")).unwrap();
    svc.submit_donation(submission("D2", "Stored")).unwrap();

    let json = serde_json::to_string(&svc.read_chain()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let first = &value[0];
    for key in ["pos", "data", "hash", "time", "prevhash"] {
        assert!(first.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(first["prevhash"], "");
    assert_eq!(value[1]["data"]["donor_id"], "D1");

    let restored = Ledger::from_blocks(serde_json::from_str(&json).unwrap()).unwrap();
    assert_eq!(restored.snapshot(), svc.read_chain());

    let edited = json.replacen("\"D2\"", "\"D3\"", 1);
    let err = Ledger::from_blocks(serde_json::from_str(&edited).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::IntegrityFailure { position: 2, source: BlockError::HashMismatch { .. } }
    ));
}
