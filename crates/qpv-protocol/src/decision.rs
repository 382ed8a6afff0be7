//! Fidelity-based decision used by the attacking pair.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use qpv_quantum::QuantumResult;

use crate::basis::{Basis, BasisMetadata};

/// `|⟨ψ|ψ'⟩|²` for two single-qubit kets.
pub fn fidelity(psi: &[Complex64; 2], psi_prime: &[Complex64; 2]) -> f64 {
    let overlap = psi[0].conj() * psi_prime[0] + psi[1].conj() * psi_prime[1];
    overlap.norm_sqr()
}

/// Fraction of honest traffic lost between Alice and the verification point.
///
/// `1 - (1 - p_absorption)·η·10^(-d·α/10)` where `d` is the distance from
/// Alice in km and `α` the fibre attenuation in dB/km.
pub fn l_fraction(
    absorption: f64,
    detector_efficiency: f64,
    distance_km: f64,
    attenuation_db_per_km: f64,
) -> f64 {
    let transmission = 10f64.powf(-distance_km * attenuation_db_per_km / 10.0);
    1.0 - (1.0 - absorption) * detector_efficiency * transmission
}

/// What to report given a fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// The bases are nearly opposite: report the complement.
    Flip,
    /// The bases nearly agree: report the outcome.
    Keep,
    /// Too uncertain: claim the photon was lost.
    Abstain,
}

impl Decision {
    /// Compare `f` against the exclusive bounds `(1 ∓ l)/2`.
    pub fn from_fidelity(f: f64, l_fraction: f64) -> Self {
        if f < (1.0 - l_fraction) / 2.0 {
            Decision::Flip
        } else if f > (1.0 + l_fraction) / 2.0 {
            Decision::Keep
        } else {
            Decision::Abstain
        }
    }

    /// The reply for a raw measurement outcome; `None` is `NO_PHOTON`.
    pub fn apply(self, outcome: bool) -> Option<bool> {
        match self {
            Decision::Flip => Some(!outcome),
            Decision::Keep => Some(outcome),
            Decision::Abstain => None,
        }
    }
}

/// The fidelity attack strategy shared by both adversaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FidelityStrategy {
    /// Basis resolution.
    pub m: u32,
    /// Abstention threshold.
    pub l_fraction: f64,
}

impl FidelityStrategy {
    pub fn new(m: u32, l_fraction: f64) -> Self {
        Self { m, l_fraction }
    }

    /// Fidelity between the adversary's and the verifiers' basis vector for `outcome`.
    pub fn fidelity_between(
        &self,
        outcome: bool,
        adversary: Basis,
        verifier: Basis,
    ) -> QuantumResult<f64> {
        let adv = adversary.gate(self.m)?.ket(outcome);
        let ver = verifier.gate(self.m)?.ket(outcome);
        Ok(fidelity(&adv, &ver))
    }

    /// Decide the reply once Alice's metadata and Bob's nonce are both known.
    pub fn respond(
        &self,
        outcome: bool,
        adversary: Basis,
        metadata: BasisMetadata,
        nonce: u32,
    ) -> QuantumResult<Option<bool>> {
        let verifier = metadata.reveal(nonce, self.m);
        let f = self.fidelity_between(outcome, adversary, verifier)?;
        let decision = Decision::from_fidelity(f, self.l_fraction);
        debug!(
            fidelity = f,
            l_fraction = self.l_fraction,
            ?decision,
            "fidelity decision"
        );
        Ok(decision.apply(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fidelity_of_identical_kets_is_one() {
        let s = 1.0 / 2.0_f64.sqrt();
        let ket = [Complex64::new(s, 0.0), Complex64::new(0.0, s)];
        assert!((fidelity(&ket, &ket) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fidelity_of_orthogonal_kets_is_zero() {
        let zero = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        let one = [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)];
        assert_eq!(fidelity(&zero, &one), 0.0);
    }

    #[test]
    fn test_l_fraction_at_zero_distance() {
        let l = l_fraction(0.3, 0.96, 0.0, 0.18);
        assert!((l - (1.0 - 0.7 * 0.96)).abs() < 1e-12);
        assert_eq!(l_fraction(0.0, 1.0, 0.0, 0.18), 0.0);
    }

    #[test]
    fn test_decision_regions() {
        let l = 0.4;
        assert_eq!(Decision::from_fidelity(0.1, l), Decision::Flip);
        assert_eq!(Decision::from_fidelity(0.9, l), Decision::Keep);
        assert_eq!(Decision::from_fidelity(0.5, l), Decision::Abstain);
        assert_eq!(Decision::Flip.apply(true), Some(false));
        assert_eq!(Decision::Keep.apply(true), Some(true));
        assert_eq!(Decision::Abstain.apply(true), None);
    }

    #[test]
    fn test_matching_basis_keeps_outcome() {
        let strategy = FidelityStrategy::new(4, 0.3);
        let basis = Basis { theta: 1, phi: 2 };
        let metadata = basis.conceal(3, 4);
        assert_eq!(strategy.respond(true, basis, metadata, 3).unwrap(), Some(true));
    }
}
