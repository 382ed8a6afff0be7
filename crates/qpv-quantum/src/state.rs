//! Single-qubit density matrix.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// A 2×2 complex matrix, row-major.
pub type Matrix2 = [[Complex64; 2]; 2];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// The Pauli X gate.
pub const PAULI_X: Matrix2 = [[ZERO, ONE], [ONE, ZERO]];

/// The state of one qubit as a density matrix `ρ`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityMatrix {
    rho: Matrix2,
}

impl DensityMatrix {
    /// The pure state |0⟩⟨0|.
    pub fn zero() -> Self {
        Self {
            rho: [[ONE, ZERO], [ZERO, ZERO]],
        }
    }

    /// The computational basis state |bit⟩⟨bit|.
    pub fn basis(bit: bool) -> Self {
        if bit {
            Self {
                rho: [[ZERO, ZERO], [ZERO, ONE]],
            }
        } else {
            Self::zero()
        }
    }

    /// The pure state |ψ⟩⟨ψ| for a (normalized) ket.
    pub fn from_ket(ket: [Complex64; 2]) -> Self {
        let mut rho = [[ZERO; 2]; 2];
        for (i, row) in rho.iter_mut().enumerate() {
            for (j, entry) in row.iter_mut().enumerate() {
                *entry = ket[i] * ket[j].conj();
            }
        }
        Self { rho }
    }

    /// Raw matrix entries.
    pub fn matrix(&self) -> &Matrix2 {
        &self.rho
    }

    /// Conjugate by a unitary: `ρ ← U ρ U†`.
    pub fn apply_unitary(&mut self, u: &Matrix2) {
        let u_rho = multiply(u, &self.rho);
        self.rho = multiply(&u_rho, &dagger(u));
    }

    /// Depolarise towards the maximally mixed state: `ρ ← ξρ + (1-ξ)·I/2`.
    pub fn depolarize(&mut self, xi: f64) {
        let mixed = (1.0 - xi) / 2.0;
        for (i, row) in self.rho.iter_mut().enumerate() {
            for (j, entry) in row.iter_mut().enumerate() {
                *entry *= xi;
                if i == j {
                    *entry += mixed;
                }
            }
        }
    }

    /// Purity `tr(ρ²)`.
    pub fn purity(&self) -> f64 {
        let sq = multiply(&self.rho, &self.rho);
        (sq[0][0] + sq[1][1]).re
    }

    /// Determinant (real part).
    pub fn determinant(&self) -> f64 {
        (self.rho[0][0] * self.rho[1][1] - self.rho[0][1] * self.rho[1][0]).re
    }

    /// Uhlmann fidelity with another qubit state: `tr(ρσ) + 2·√(det ρ · det σ)`.
    pub fn fidelity(&self, other: &DensityMatrix) -> f64 {
        let product = multiply(&self.rho, &other.rho);
        let overlap = (product[0][0] + product[1][1]).re;
        overlap + 2.0 * (self.determinant() * other.determinant()).max(0.0).sqrt()
    }

    /// Trace of the matrix (real part).
    pub fn trace(&self) -> f64 {
        (self.rho[0][0] + self.rho[1][1]).re
    }

    /// Probability of observing |1⟩ in the computational basis.
    pub fn probability_one(&self) -> f64 {
        let total = self.trace();
        if total <= 0.0 {
            return 0.0;
        }
        (self.rho[1][1].re / total).clamp(0.0, 1.0)
    }

    /// Fidelity with a pure state, `⟨ψ|ρ|ψ⟩`.
    pub fn fidelity_with(&self, ket: [Complex64; 2]) -> f64 {
        let mut acc = ZERO;
        for i in 0..2 {
            for j in 0..2 {
                acc += ket[i].conj() * self.rho[i][j] * ket[j];
            }
        }
        acc.re
    }
}

/// Matrix product `a · b`.
pub fn multiply(a: &Matrix2, b: &Matrix2) -> Matrix2 {
    let mut out = [[ZERO; 2]; 2];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, entry) in row.iter_mut().enumerate() {
            *entry = a[i][0] * b[0][j] + a[i][1] * b[1][j];
        }
    }
    out
}

/// Conjugate transpose.
pub fn dagger(u: &Matrix2) -> Matrix2 {
    [
        [u[0][0].conj(), u[1][0].conj()],
        [u[0][1].conj(), u[1][1].conj()],
    ]
}

/// Apply a matrix to a ket.
pub fn apply_to_ket(u: &Matrix2, ket: [Complex64; 2]) -> [Complex64; 2] {
    [
        u[0][0] * ket[0] + u[0][1] * ket[1],
        u[1][0] * ket[0] + u[1][1] * ket[1],
    ]
}
