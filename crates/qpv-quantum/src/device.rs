//! The quantum operation capability consumed by protocol roles.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::QuantumResult;
use crate::gate::PreparationGate;
use crate::register::QuantumRegister;

/// Durations of the primitive operations, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationDurations {
    /// Qubit initialisation.
    pub init: f64,
    /// Any single-qubit gate.
    pub gate: f64,
    /// Measurement.
    pub measure: f64,
}

impl OperationDurations {
    /// Time to initialise a photon in `|bit⟩` and rotate it into its basis.
    pub fn encode(&self, bit: bool) -> f64 {
        let flip = if bit { self.gate } else { 0.0 };
        self.init + flip + self.gate
    }

    /// Time to undo a basis rotation and measure.
    pub fn decode(&self) -> f64 {
        self.gate + self.measure
    }
}

/// A device able to prepare, rotate and measure one photonic qubit.
///
/// Physical loss is reported through the register and never as an error.
/// Errors are reserved for parameters that are physically invalid.
pub trait QuantumDevice: Send {
    /// Device name for logging.
    fn name(&self) -> &str;

    /// Create a photon in the computational state `|bit⟩`.
    fn initialize(&mut self, bit: bool, rng: &mut dyn RngCore) -> QuantumResult<QuantumRegister>;

    /// Apply the preparation gate, or its inverse, to `register`.
    fn prepare(
        &mut self,
        register: &mut QuantumRegister,
        gate: &PreparationGate,
        inverse: bool,
        rng: &mut dyn RngCore,
    ) -> QuantumResult<()>;

    /// Destructively measure in the computational basis.
    ///
    /// Returns `None` when the photon was lost or not detected.
    fn measure(
        &mut self,
        register: QuantumRegister,
        rng: &mut dyn RngCore,
    ) -> QuantumResult<Option<bool>>;

    /// Operation durations.
    fn durations(&self) -> OperationDurations;
}
