//! Tests for the reference photonic processor and its error models.

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use qpv_quantum::{
    Absorption, DensityMatrix, DetectorEfficiency, FibreDepolarization, FibreLoss, FibreModel,
    OperationDurations, PhotonGenerator, PreparationGate, Processor, ProcessorProfile,
    QuantumDevice, QuantumError, QuantumRegister,
};

fn lossy_profile(absorption: f64, efficiency: f64) -> ProcessorProfile {
    ProcessorProfile {
        generator: None,
        gate_absorption: Absorption::new(absorption).unwrap(),
        detector: DetectorEfficiency::new(efficiency).unwrap(),
        durations: OperationDurations::default(),
    }
}

// ---------------------------------------------------------------------------
// Loss statistics
// ---------------------------------------------------------------------------

#[test]
fn absorption_rate_matches_configuration() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut device = Processor::new("bs", lossy_profile(0.3, 1.0));
    let gate = PreparationGate::new(0, 0, 1).unwrap();
    let trials = 4000;
    let mut lost = 0;
    for _ in 0..trials {
        let mut reg = device.initialize(false, &mut rng).unwrap();
        device.prepare(&mut reg, &gate, false, &mut rng).unwrap();
        if reg.is_lost() {
            lost += 1;
        }
    }
    let rate = f64::from(lost) / f64::from(trials);
    assert!((rate - 0.3).abs() < 0.03, "absorption rate {rate}");
}

#[test]
fn bit_one_passes_two_lossy_gates() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut device = Processor::new("bs", lossy_profile(0.5, 1.0));
    let gate = PreparationGate::new(0, 0, 1).unwrap();
    let trials = 4000;
    let mut survived = 0;
    for _ in 0..trials {
        let mut reg = device.initialize(true, &mut rng).unwrap();
        device.prepare(&mut reg, &gate, false, &mut rng).unwrap();
        if !reg.is_lost() {
            survived += 1;
        }
    }
    let rate = f64::from(survived) / f64::from(trials);
    assert!((rate - 0.25).abs() < 0.03, "survival rate {rate}");
}

#[test]
fn detector_inefficiency_reports_none() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut device = Processor::new("det", lossy_profile(0.0, 0.0));
    let reg = QuantumRegister::new(DensityMatrix::zero());
    assert_eq!(device.measure(reg, &mut rng).unwrap(), None);
}

#[test]
fn fibre_loss_statistics() {
    let mut rng = StdRng::seed_from_u64(77);
    let model = FibreModel {
        loss: FibreLoss::new(0.2, 0.18).unwrap(),
        noise: Some(FibreDepolarization::new(0.047, 50.0).unwrap()),
    };
    let trials = 4000;
    let mut survived = 0;
    for _ in 0..trials {
        let mut reg = QuantumRegister::new(DensityMatrix::zero());
        model.apply(&mut reg, 25.0, &mut rng).unwrap();
        if !reg.is_lost() {
            survived += 1;
        }
    }
    let expected = model.loss.survival_probability(25.0);
    let rate = f64::from(survived) / f64::from(trials);
    assert!((rate - expected).abs() < 0.03, "survival {rate} vs {expected}");
}

// ---------------------------------------------------------------------------
// Numerical preconditions
// ---------------------------------------------------------------------------

#[test]
fn generator_cp_violation_aborts_initialisation() {
    let profile = ProcessorProfile {
        generator: Some(PhotonGenerator::new(0.9).unwrap()),
        ..ProcessorProfile::ideal()
    };
    let mut device = Processor::new("bad", profile);
    let mut rng = StdRng::seed_from_u64(0);
    let result = device.initialize(false, &mut rng);
    assert!(matches!(
        result,
        Err(QuantumError::CompletePositivity { .. })
    ));
}

#[test]
fn verifier_generator_degrades_fidelity_slightly() {
    let mut device = Processor::new(
        "alice",
        ProcessorProfile {
            gate_absorption: Absorption::none(),
            ..ProcessorProfile::verifier().unwrap()
        },
    );
    let mut rng = StdRng::seed_from_u64(0);
    let reg = device.initialize(false, &mut rng).unwrap();
    let state = reg.state().unwrap();
    assert!((state.probability_one() - 0.005).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// Gate properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prepared_kets_are_normalized(m in 1u32..16, theta_frac in 0.0f64..1.0, phi in 0u32..64) {
        let theta = ((theta_frac * f64::from(m)) as u32).min(m - 1);
        let gate = PreparationGate::new(theta, phi, m).unwrap();
        for bit in [false, true] {
            let ket = gate.ket(bit);
            let norm = ket[0].norm_sqr() + ket[1].norm_sqr();
            prop_assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn ideal_encode_decode_is_deterministic(m in 1u32..8, theta_frac in 0.0f64..1.0, phi in 0u32..16, bit: bool, seed: u64) {
        let theta = ((theta_frac * f64::from(m)) as u32).min(m - 1);
        let gate = PreparationGate::new(theta, phi, m).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut device = Processor::new("ideal", ProcessorProfile::ideal());
        let mut reg = device.initialize(bit, &mut rng).unwrap();
        device.prepare(&mut reg, &gate, false, &mut rng).unwrap();
        device.prepare(&mut reg, &gate, true, &mut rng).unwrap();
        let p_one = reg.state().unwrap().probability_one();
        let expected = if bit { 1.0 } else { 0.0 };
        prop_assert!((p_one - expected).abs() < 1e-9);
    }
}
