//! Photonic error models.
//!
//! Loss models decide whether a photon survives an element; noise models
//! transform the state of a surviving photon. Parameters are validated at
//! construction so a bad configuration fails before any round runs.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{QuantumError, QuantumResult, check_magnitude, check_probability};
use crate::register::QuantumRegister;
use crate::state::DensityMatrix;

/// Hilbert space dimension of one qubit.
const DIMENSION: f64 = 2.0;

/// Agreement required when matching a fidelity target.
const FIDELITY_TOLERANCE: f64 = 1e-9;

/// Depolarising noise added when a photon is generated.
///
/// The target is a fidelity loss `f` relative to the ideal state. The
/// depolarising parameter is `ξ = (1 - 2f) / (2·tr(ρ²) - 1)`, which must
/// respect `-1/(d²-1) ≤ ξ ≤ 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotonGenerator {
    fidelity_loss: f64,
}

impl PhotonGenerator {
    /// Create the model; `fidelity_loss` must be a probability.
    pub fn new(fidelity_loss: f64) -> QuantumResult<Self> {
        check_probability("fidelity_loss", fidelity_loss)?;
        Ok(Self { fidelity_loss })
    }

    /// Configured fidelity loss.
    pub fn fidelity_loss(&self) -> f64 {
        self.fidelity_loss
    }

    /// Depolarising parameter for a given state, checked against the CP bound.
    pub fn xi(&self, state: &DensityMatrix) -> QuantumResult<f64> {
        let xi = (1.0 - 2.0 * self.fidelity_loss) / (2.0 * state.purity() - 1.0);
        let lower = -1.0 / (DIMENSION * DIMENSION - 1.0);
        let upper = 1.0;
        if !xi.is_finite() || xi < lower || xi > upper {
            return Err(QuantumError::CompletePositivity { xi, lower, upper });
        }
        Ok(xi)
    }

    /// Apply the noise to a live register.
    pub fn apply(&self, register: &mut QuantumRegister) -> QuantumResult<()> {
        if let Some(state) = register.state_mut() {
            let xi = self.xi(state)?;
            state.depolarize(xi);
        }
        Ok(())
    }
}

/// Beam-splitter absorption: the photon is lost with a fixed probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Absorption {
    probability: f64,
}

impl Absorption {
    /// Create the model; `probability` must lie in `[0, 1]`.
    pub fn new(probability: f64) -> QuantumResult<Self> {
        check_probability("absorption", probability)?;
        Ok(Self { probability })
    }

    /// No absorption.
    pub fn none() -> Self {
        Self { probability: 0.0 }
    }

    /// Loss probability.
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Possibly mark the register lost.
    pub fn apply(&self, register: &mut QuantumRegister, rng: &mut dyn RngCore) {
        if register.is_lost() || self.probability <= 0.0 {
            return;
        }
        if rng.r#gen::<f64>() < self.probability {
            trace!(probability = self.probability, "photon absorbed");
            register.lose();
        }
    }
}

/// Detector efficiency: the photon is detected with probability `efficiency`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorEfficiency {
    efficiency: f64,
}

impl DetectorEfficiency {
    /// Create the model; `efficiency` must lie in `[0, 1]`.
    pub fn new(efficiency: f64) -> QuantumResult<Self> {
        check_probability("detector_efficiency", efficiency)?;
        Ok(Self { efficiency })
    }

    /// A perfect detector.
    pub fn perfect() -> Self {
        Self { efficiency: 1.0 }
    }

    /// Detection probability.
    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }

    /// Possibly mark the register lost before readout.
    pub fn apply(&self, register: &mut QuantumRegister, rng: &mut dyn RngCore) {
        if register.is_lost() || self.efficiency >= 1.0 {
            return;
        }
        if rng.r#gen::<f64>() >= self.efficiency {
            trace!(efficiency = self.efficiency, "photon not detected");
            register.lose();
        }
    }
}

/// Length-dependent fibre attenuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibreLoss {
    p_loss_init: f64,
    p_loss_length: f64,
}

impl FibreLoss {
    /// Create the model from a coupling loss probability and an attenuation in dB/km.
    pub fn new(p_loss_init: f64, p_loss_length: f64) -> QuantumResult<Self> {
        check_probability("p_loss_init", p_loss_init)?;
        check_magnitude("p_loss_length", p_loss_length)?;
        Ok(Self {
            p_loss_init,
            p_loss_length,
        })
    }

    /// A lossless fibre.
    pub fn lossless() -> Self {
        Self {
            p_loss_init: 0.0,
            p_loss_length: 0.0,
        }
    }

    /// Attenuation in dB/km.
    pub fn p_loss_length(&self) -> f64 {
        self.p_loss_length
    }

    /// Probability that a photon survives `length_km` of fibre.
    pub fn survival_probability(&self, length_km: f64) -> f64 {
        (1.0 - self.p_loss_init) * 10f64.powf(-length_km * self.p_loss_length / 10.0)
    }

    /// Possibly mark the register lost.
    pub fn apply(&self, register: &mut QuantumRegister, length_km: f64, rng: &mut dyn RngCore) {
        if register.is_lost() {
            return;
        }
        let survive = self.survival_probability(length_km);
        if survive < 1.0 && rng.r#gen::<f64>() >= survive {
            trace!(length_km, survive, "photon lost in fibre");
            register.lose();
        }
    }
}

/// Fibre depolarisation specified as a fidelity loss over a reference length.
///
/// For an incoming state `ρ'` the per-reference-length parameter `ξ'` is the
/// one for which `F(ρ', ξ'ρ' + (1-ξ')·I/2) = 1 - f`. With `s` the Bloch
/// length of `ρ'` and `k = 1 - 2f` the candidates are
/// `ξ' = k ± √((1-k²)(1-s²)) / s`. Over a length `L` the applied parameter
/// is `ξ'^(L / L₀)`. A pure state gives `ξ' = 1 - 2f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibreDepolarization {
    fidelity_loss: f64,
    reference_length_km: f64,
}

impl FibreDepolarization {
    /// Create the model; the reference length must be positive.
    pub fn new(fidelity_loss: f64, reference_length_km: f64) -> QuantumResult<Self> {
        check_probability("fibre_fidelity_loss", fidelity_loss)?;
        if !(reference_length_km.is_finite() && reference_length_km > 0.0) {
            return Err(QuantumError::InvalidMagnitude {
                name: "fibre_reference_length_km",
                value: reference_length_km,
            });
        }
        if fidelity_loss > 0.5 {
            // (1 - 2f) would be negative and not composable over length
            return Err(QuantumError::CompletePositivity {
                xi: 1.0 - 2.0 * fidelity_loss,
                lower: 0.0,
                upper: 1.0,
            });
        }
        Ok(Self {
            fidelity_loss,
            reference_length_km,
        })
    }

    /// Depolarising parameter for one reference length, given the incoming state.
    pub fn reference_xi(&self, state: &DensityMatrix) -> QuantumResult<f64> {
        let bloch_sq = (2.0 * state.purity() - 1.0).clamp(0.0, 1.0);
        if bloch_sq <= f64::EPSILON {
            // the maximally mixed state is left unchanged by any ξ
            return Ok(1.0);
        }
        let k = 1.0 - 2.0 * self.fidelity_loss;
        let spread = ((1.0 - k * k) * (1.0 - bloch_sq)).max(0.0).sqrt() / bloch_sq.sqrt();
        let target = 1.0 - self.fidelity_loss;
        let reaches_target = |xi: f64| {
            let mut noisy = state.clone();
            noisy.depolarize(xi);
            (state.fidelity(&noisy) - target).abs() < FIDELITY_TOLERANCE
        };
        let xi = if reaches_target(k + spread) {
            k + spread
        } else {
            k - spread
        };
        if !xi.is_finite() || !(0.0..=1.0).contains(&xi) || !reaches_target(xi) {
            return Err(QuantumError::CompletePositivity {
                xi,
                lower: 0.0,
                upper: 1.0,
            });
        }
        Ok(xi)
    }

    /// Depolarising parameter over `length_km` for the incoming state.
    pub fn xi(&self, state: &DensityMatrix, length_km: f64) -> QuantumResult<f64> {
        let xi = self.reference_xi(state)?;
        Ok(xi.powf(length_km / self.reference_length_km))
    }

    /// Apply the noise to a live register.
    pub fn apply(&self, register: &mut QuantumRegister, length_km: f64) -> QuantumResult<()> {
        if let Some(state) = register.state_mut() {
            let xi = self.xi(state, length_km)?;
            state.depolarize(xi);
        }
        Ok(())
    }
}

/// Combined loss and noise of a quantum fibre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibreModel {
    /// Attenuation.
    pub loss: FibreLoss,
    /// Optional depolarisation.
    pub noise: Option<FibreDepolarization>,
}

impl FibreModel {
    /// A perfect fibre.
    pub fn ideal() -> Self {
        Self {
            loss: FibreLoss::lossless(),
            noise: None,
        }
    }

    /// A fibre that loses every photon.
    pub fn opaque() -> Self {
        Self {
            loss: FibreLoss {
                p_loss_init: 1.0,
                p_loss_length: 0.0,
            },
            noise: None,
        }
    }

    /// Apply noise, then loss, for a traversal of `length_km`.
    pub fn apply(
        &self,
        register: &mut QuantumRegister,
        length_km: f64,
        rng: &mut dyn RngCore,
    ) -> QuantumResult<()> {
        if let Some(noise) = &self.noise {
            noise.apply(register, length_km)?;
        }
        self.loss.apply(register, length_km, rng);
        Ok(())
    }
}
