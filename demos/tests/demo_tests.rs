//! Tests for the demo round table and verdict.

use qpv_demos::{accepted, outcome_label, round_rows};
use qpv_protocol::{HonestSetup, ProtocolConfig, RoundOutcome};

fn noiseless(rounds: u64) -> ProtocolConfig {
    ProtocolConfig {
        rounds,
        seed: Some(3),
        ..ProtocolConfig::noiseless()
    }
}

#[test]
fn honest_prover_at_position_is_accepted() {
    let report = HonestSetup::at_verification(noiseless(4))
        .unwrap()
        .run()
        .unwrap();
    assert!(accepted(&report));
}

#[test]
fn displaced_prover_is_rejected() {
    let report = HonestSetup::new(noiseless(4), 3.0).unwrap().run().unwrap();
    assert!(!accepted(&report));
}

#[test]
fn round_rows_join_both_verifiers() {
    let report = HonestSetup::at_verification(noiseless(3))
        .unwrap()
        .run()
        .unwrap();
    let rows = round_rows(&report);
    assert_eq!(rows.len(), 3);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.round, i + 1);
        assert_eq!(row.alice, Some((RoundOutcome::Answered(true), true)));
        assert_eq!(row.bob, Some((RoundOutcome::Answered(true), true)));
        assert!(row.basis.starts_with("m0=("));
        assert!(row.basis.contains(" m1="));
    }
}

#[test]
fn displaced_prover_rows_show_bob_late() {
    let report = HonestSetup::new(noiseless(2), -2.0).unwrap().run().unwrap();
    assert!(round_rows(&report).iter().all(|row| {
        matches!(row.alice, Some((_, true))) && matches!(row.bob, Some((_, false)))
    }));
}

#[test]
fn outcome_labels_are_distinct() {
    let labels = [
        RoundOutcome::Answered(true),
        RoundOutcome::Answered(false),
        RoundOutcome::NoPhoton,
        RoundOutcome::NotSent,
    ]
    .map(outcome_label);
    assert_eq!(labels, ["correct", "wrong", "no photon", "not sent"]);
}
