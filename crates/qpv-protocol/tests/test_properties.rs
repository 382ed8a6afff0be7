//! Property tests over delays, fidelity and round accounting.

use proptest::prelude::*;

use qpv_protocol::{
    Basis, Decision, DelayModel, FidelityStrategy, HonestSetup, ProtocolConfig, RoundOutcome,
    TimingPlan,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn delay_is_linear_and_positive(a in 0.001f64..500.0, b in 0.001f64..500.0) {
        for model in [DelayModel::classical(), DelayModel::quantum()] {
            let sum = model.delay_ns(a) + model.delay_ns(b);
            prop_assert!(model.delay_ns(a) > 0.0);
            prop_assert!((model.delay_ns(a + b) - sum).abs() <= 1e-9 * sum);
        }
        prop_assert!(DelayModel::quantum().delay_ns(a) >= DelayModel::classical().delay_ns(a));
    }

    #[test]
    fn fidelity_decreases_with_polar_distance(m in 1u32..12, outcome in any::<bool>()) {
        let strategy = FidelityStrategy::new(m, 0.0);
        let verifier = Basis { theta: 0, phi: 0 };
        let mut previous = f64::INFINITY;
        for theta in 0..=m {
            let adversary = Basis { theta, phi: 0 };
            let f = strategy.fidelity_between(outcome, adversary, verifier).unwrap();
            prop_assert!(f < previous, "m {m}, theta {theta}: {f} !< {previous}");
            previous = f;
        }
    }

    #[test]
    fn decision_follows_threshold(f in 0.0f64..=1.0, l in 0.0f64..1.0, outcome in any::<bool>()) {
        let reply = Decision::from_fidelity(f, l).apply(outcome);
        if f < (1.0 - l) / 2.0 {
            prop_assert_eq!(reply, Some(!outcome));
        } else if f > (1.0 + l) / 2.0 {
            prop_assert_eq!(reply, Some(outcome));
        } else {
            prop_assert_eq!(reply, None);
        }
    }

    #[test]
    fn arrivals_coincide_for_any_verification_point(
        fraction in 0.01f64..0.99,
        span in 1.0f64..200.0,
    ) {
        let d_a = span * fraction;
        let plan = TimingPlan::new(
            d_a,
            span - d_a,
            DelayModel::classical(),
            DelayModel::quantum(),
            0.0,
            0.021,
            0.001,
        );
        let photon = plan.photon_arrival();
        prop_assert!((photon - plan.metadata_arrival()).abs() <= 1e-9 * photon.max(1.0));
        prop_assert!((photon - plan.nonce_arrival()).abs() <= 1e-9 * photon.max(1.0));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn result_logs_stay_parallel(rounds in 1u64..6, bases in 1u32..5, seed in any::<u64>()) {
        let config = ProtocolConfig {
            rounds,
            bases,
            seed: Some(seed),
            ..ProtocolConfig::default()
        };
        let report = HonestSetup::at_verification(config).unwrap().run().unwrap();
        for results in [report.alice().unwrap(), report.bob().unwrap()] {
            prop_assert_eq!(results.correctness().len(), results.timeliness().len());
            prop_assert_eq!(results.correctness().len(), results.basis_values().len());
            prop_assert_eq!(results.answered() as u64, rounds);
        }
    }

    #[test]
    fn noiseless_runs_issue_exactly_n_rounds(rounds in 1u64..8, seed in any::<u64>()) {
        let config = ProtocolConfig {
            rounds,
            seed: Some(seed),
            ..ProtocolConfig::noiseless()
        };
        let report = HonestSetup::at_verification(config).unwrap().run().unwrap();
        let alice = report.alice().unwrap();
        prop_assert_eq!(alice.len() as u64, rounds);
        prop_assert!(alice.correctness().iter().all(|o| *o == RoundOutcome::Answered(true)));
    }
}
