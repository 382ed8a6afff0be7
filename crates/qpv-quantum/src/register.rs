//! A single-qubit memory slot that may lose its photon.

use serde::{Deserialize, Serialize};

use crate::state::DensityMatrix;

/// The carrier of one qubit between devices and channels.
///
/// A lost register keeps travelling through the network so that timing is
/// unaffected; only its state is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumRegister {
    state: Option<DensityMatrix>,
}

impl QuantumRegister {
    /// A live register holding `state`.
    pub fn new(state: DensityMatrix) -> Self {
        Self { state: Some(state) }
    }

    /// A register whose photon is already gone.
    pub fn lost() -> Self {
        Self { state: None }
    }

    /// Whether the photon has been lost.
    pub fn is_lost(&self) -> bool {
        self.state.is_none()
    }

    /// Mark the photon as lost.
    pub fn lose(&mut self) {
        self.state = None;
    }

    pub fn state(&self) -> Option<&DensityMatrix> {
        self.state.as_ref()
    }

    pub fn state_mut(&mut self) -> Option<&mut DensityMatrix> {
        self.state.as_mut()
    }
}
