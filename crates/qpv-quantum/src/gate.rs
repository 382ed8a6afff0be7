//! The BB84-style preparation gate parameterised by discrete basis indices.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{QuantumError, QuantumResult};
use crate::state::{Matrix2, apply_to_ket, dagger};

/// Rotation selecting one of the discretised measurement bases.
///
/// `theta` indexes the polar angle `σ = arccos(2θ/m - 1)` and `phi` the
/// azimuthal one `δ = φπ / (m·sin σ)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationGate {
    theta: u32,
    phi: u32,
    m: u32,
}

impl PreparationGate {
    /// Build a gate, checking `m ≥ 1` and `theta ≤ m`.
    pub fn new(theta: u32, phi: u32, m: u32) -> QuantumResult<Self> {
        if m == 0 || theta > m {
            return Err(QuantumError::InvalidBasis { theta, phi, m });
        }
        Ok(Self { theta, phi, m })
    }

    /// Polar index.
    pub fn theta(&self) -> u32 {
        self.theta
    }

    /// Azimuthal index.
    pub fn phi(&self) -> u32 {
        self.phi
    }

    /// Basis resolution.
    pub fn m(&self) -> u32 {
        self.m
    }

    /// Polar angle `σ`.
    pub fn sigma(&self) -> f64 {
        (2.0 * f64::from(self.theta) / f64::from(self.m) - 1.0)
            .clamp(-1.0, 1.0)
            .acos()
    }

    /// Azimuthal angle `δ`; zero at the pole.
    pub fn delta(&self) -> f64 {
        let sigma = self.sigma();
        if sigma == 0.0 {
            0.0
        } else {
            f64::from(self.phi) * PI / (f64::from(self.m) * sigma.sin())
        }
    }

    /// The unitary `U(θ, φ)`.
    pub fn matrix(&self) -> Matrix2 {
        let sigma = self.sigma();
        let delta = self.delta();
        let (s, c) = ((sigma / 2.0).sin(), (sigma / 2.0).cos());
        let phase = Complex64::from_polar(1.0, delta);
        let m = [
            [Complex64::new(c, 0.0), phase * s],
            [-(phase.conj() * s), Complex64::new(c, 0.0)],
        ];
        m.map(|row| row.map(finite_or_zero))
    }

    /// `U†`, undoing the preparation.
    pub fn inverse_matrix(&self) -> Matrix2 {
        dagger(&self.matrix())
    }

    /// The prepared ket `U·|bit⟩`.
    pub fn ket(&self, bit: bool) -> [Complex64; 2] {
        let basis = if bit {
            [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)]
        } else {
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)]
        };
        apply_to_ket(&self.matrix(), basis)
    }
}

fn finite_or_zero(z: Complex64) -> Complex64 {
    Complex64::new(
        if z.re.is_finite() { z.re } else { 0.0 },
        if z.im.is_finite() { z.im } else { 0.0 },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::multiply;

    fn is_identity(u: &Matrix2) -> bool {
        (u[0][0] - Complex64::new(1.0, 0.0)).norm() < 1e-10
            && (u[1][1] - Complex64::new(1.0, 0.0)).norm() < 1e-10
            && u[0][1].norm() < 1e-10
            && u[1][0].norm() < 1e-10
    }

    #[test]
    fn test_rejects_out_of_range_theta() {
        assert!(PreparationGate::new(3, 0, 2).is_err());
        assert!(PreparationGate::new(0, 0, 0).is_err());
        assert!(PreparationGate::new(2, 0, 2).is_ok());
    }

    #[test]
    fn test_theta_zero_m_one_is_bit_flip_basis() {
        // σ = π: U maps |0⟩ to -|1⟩ up to phase
        let gate = PreparationGate::new(0, 0, 1).unwrap();
        let ket = gate.ket(false);
        assert!(ket[0].norm() < 1e-10);
        assert!((ket[1].norm() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_inverse_is_unitary_inverse() {
        for (theta, phi, m) in [(0, 0, 1), (1, 3, 4), (3, 7, 8), (2, 1, 3)] {
            let gate = PreparationGate::new(theta, phi, m).unwrap();
            let product = multiply(&gate.inverse_matrix(), &gate.matrix());
            assert!(is_identity(&product), "U†U != I for {gate:?}");
        }
    }

    #[test]
    fn test_pole_has_no_phase() {
        let gate = PreparationGate::new(4, 5, 4).unwrap();
        assert_eq!(gate.sigma(), 0.0);
        assert_eq!(gate.delta(), 0.0);
        assert!(is_identity(&gate.matrix()));
    }
}
