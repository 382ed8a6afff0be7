//! Discretised measurement bases and the nonce-masked metadata that carries them.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use qpv_quantum::{PreparationGate, QuantumResult};

/// A basis choice `(theta, phi)` for resolution `m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Basis {
    /// Polar index in `[0, m-1]`.
    pub theta: u32,
    /// Azimuthal index in `[0, phi_bound(theta, m)]`.
    pub phi: u32,
}

/// Basis indices masked by a nonce, as sent to the player (`m0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BasisMetadata {
    /// `(theta - r) mod (2m+1)`.
    pub theta: u32,
    /// `(phi - r) mod (2m+1)`.
    pub phi: u32,
}

/// Largest resolution whose masked indices `[0, 2m]` fit in a `u32`.
pub const MAX_BASES: u32 = u32::MAX / 2;

/// Modulus of the nonce masking for resolution `m`.
pub fn modulus(m: u32) -> i64 {
    2 * i64::from(m) + 1
}

/// Upper bound of `phi` for a given `theta`: `round(2m·sin(arccos(2θ/m - 1)))`.
pub fn phi_bound(theta: u32, m: u32) -> u32 {
    let m_f = f64::from(m);
    let cos_sigma = (2.0 * f64::from(theta) / m_f - 1.0).clamp(-1.0, 1.0);
    (2.0 * m_f * cos_sigma.acos().sin()).round().max(0.0) as u32
}

/// A uniformly random nonce in `[0, 2m]`, for `m` up to [`MAX_BASES`].
pub fn random_nonce(m: u32, rng: &mut dyn RngCore) -> u32 {
    rng.gen_range(0..=m.min(MAX_BASES) * 2)
}

fn masked(value: u32, offset: i64, m: u32) -> u32 {
    // the result lies in [0, 2m] so it always fits
    (i64::from(value) + offset).rem_euclid(modulus(m)) as u32
}

impl Basis {
    /// Draw a basis uniformly: `theta` in `[0, m-1]`, then `phi` under its envelope.
    pub fn random(m: u32, rng: &mut dyn RngCore) -> Self {
        let theta = rng.gen_range(0..m.max(1));
        let phi = rng.gen_range(0..=phi_bound(theta, m));
        Self { theta, phi }
    }

    /// The preparation gate for this basis.
    pub fn gate(&self, m: u32) -> QuantumResult<PreparationGate> {
        PreparationGate::new(self.theta, self.phi, m)
    }

    /// Mask the basis with `nonce`.
    pub fn conceal(&self, nonce: u32, m: u32) -> BasisMetadata {
        BasisMetadata {
            theta: masked(self.theta, -i64::from(nonce), m),
            phi: masked(self.phi, -i64::from(nonce), m),
        }
    }
}

impl BasisMetadata {
    /// Recover the basis once the nonce is known.
    pub fn reveal(&self, nonce: u32, m: u32) -> Basis {
        Basis {
            theta: masked(self.theta, i64::from(nonce), m),
            phi: masked(self.phi, i64::from(nonce), m),
        }
    }
}
