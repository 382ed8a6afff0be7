//! Reference density-matrix processor.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::device::{OperationDurations, QuantumDevice};
use crate::error::{QuantumResult, check_magnitude};
use crate::gate::PreparationGate;
use crate::noise::{Absorption, DetectorEfficiency, PhotonGenerator};
use crate::register::QuantumRegister;
use crate::state::{DensityMatrix, PAULI_X};

/// Generator fidelity loss of the verifier's photon source.
pub const VERIFIER_GENERATOR_FIDELITY_LOSS: f64 = 0.005;
/// Beam-splitter absorption on every gate of a photonic processor.
pub const BEAM_SPLITTER_ABSORPTION: f64 = 0.3;
/// Efficiency of the prover's single-photon detector.
pub const DETECTOR_EFFICIENCY: f64 = 0.96;
/// Measurement duration of the prover's detector in ns.
pub const MEASURE_TIME_NS: f64 = 0.02;

/// Error models and timing of a [`Processor`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessorProfile {
    /// Noise on photon creation.
    pub generator: Option<PhotonGenerator>,
    /// Loss on every gate.
    pub gate_absorption: Absorption,
    /// Loss at readout.
    pub detector: DetectorEfficiency,
    /// Operation durations.
    pub durations: OperationDurations,
}

impl ProcessorProfile {
    /// A noiseless, lossless, instantaneous processor.
    pub fn ideal() -> Self {
        Self {
            generator: None,
            gate_absorption: Absorption::none(),
            detector: DetectorEfficiency::perfect(),
            durations: OperationDurations::default(),
        }
    }

    /// The verifier's photon source and encoder.
    pub fn verifier() -> QuantumResult<Self> {
        Ok(Self {
            generator: Some(PhotonGenerator::new(VERIFIER_GENERATOR_FIDELITY_LOSS)?),
            gate_absorption: Absorption::new(BEAM_SPLITTER_ABSORPTION)?,
            detector: DetectorEfficiency::perfect(),
            durations: OperationDurations::default(),
        })
    }

    /// The honest prover's decoder and detector.
    pub fn prover() -> QuantumResult<Self> {
        Ok(Self {
            generator: None,
            gate_absorption: Absorption::new(BEAM_SPLITTER_ABSORPTION)?,
            detector: DetectorEfficiency::new(DETECTOR_EFFICIENCY)?,
            durations: OperationDurations {
                init: 0.0,
                gate: 0.0,
                measure: MEASURE_TIME_NS,
            },
        })
    }

    /// Override the durations, validating them.
    pub fn with_durations(mut self, durations: OperationDurations) -> QuantumResult<Self> {
        check_magnitude("init_time", durations.init)?;
        check_magnitude("gate_time", durations.gate)?;
        check_magnitude("measure_time", durations.measure)?;
        self.durations = durations;
        Ok(self)
    }
}

impl Default for ProcessorProfile {
    fn default() -> Self {
        Self::ideal()
    }
}

/// A single-qubit processor applying a [`ProcessorProfile`].
#[derive(Debug, Clone)]
pub struct Processor {
    name: String,
    profile: ProcessorProfile,
}

impl Processor {
    /// Create a processor.
    pub fn new(name: impl Into<String>, profile: ProcessorProfile) -> Self {
        Self {
            name: name.into(),
            profile,
        }
    }

    pub fn profile(&self) -> &ProcessorProfile {
        &self.profile
    }

    fn apply_gate(
        &self,
        register: &mut QuantumRegister,
        matrix: &crate::state::Matrix2,
        rng: &mut dyn RngCore,
    ) {
        if let Some(state) = register.state_mut() {
            state.apply_unitary(matrix);
        }
        self.profile.gate_absorption.apply(register, rng);
    }
}

impl QuantumDevice for Processor {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, bit: bool, rng: &mut dyn RngCore) -> QuantumResult<QuantumRegister> {
        let mut register = QuantumRegister::new(DensityMatrix::zero());
        if let Some(generator) = &self.profile.generator {
            generator.apply(&mut register)?;
        }
        if bit {
            self.apply_gate(&mut register, &PAULI_X, rng);
        }
        Ok(register)
    }

    fn prepare(
        &mut self,
        register: &mut QuantumRegister,
        gate: &PreparationGate,
        inverse: bool,
        rng: &mut dyn RngCore,
    ) -> QuantumResult<()> {
        let matrix = if inverse {
            gate.inverse_matrix()
        } else {
            gate.matrix()
        };
        self.apply_gate(register, &matrix, rng);
        Ok(())
    }

    fn measure(
        &mut self,
        mut register: QuantumRegister,
        rng: &mut dyn RngCore,
    ) -> QuantumResult<Option<bool>> {
        self.profile.detector.apply(&mut register, rng);
        let Some(state) = register.state() else {
            trace!(device = %self.name, "measured a lost photon");
            return Ok(None);
        };
        let p_one = state.probability_one();
        Ok(Some(rng.r#gen::<f64>() < p_one))
    }

    fn durations(&self) -> OperationDurations {
        self.profile.durations
    }
}
