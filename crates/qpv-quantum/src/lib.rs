//! `qpv-quantum`: single-qubit photonic operations for position verification.
//!
//! Provides the quantum capability that protocol roles consume: a photon
//! register, the discretised BB84 preparation gate, and the loss and noise
//! models of a photonic setup (source depolarisation, beam-splitter
//! absorption, detector efficiency, fibre attenuation and depolarisation).
//!
//! # Quick start
//!
//! ```rust
//! use qpv_quantum::{PreparationGate, Processor, ProcessorProfile, QuantumDevice};
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let mut device = Processor::new("lab", ProcessorProfile::ideal());
//! let gate = PreparationGate::new(1, 0, 2).unwrap();
//!
//! let mut reg = device.initialize(true, &mut rng).unwrap();
//! device.prepare(&mut reg, &gate, false, &mut rng).unwrap();
//! device.prepare(&mut reg, &gate, true, &mut rng).unwrap();
//! assert_eq!(device.measure(reg, &mut rng).unwrap(), Some(true));
//! ```

pub mod device;
pub mod error;
pub mod gate;
pub mod noise;
pub mod processor;
pub mod register;
pub mod state;

pub use device::{OperationDurations, QuantumDevice};
pub use error::{QuantumError, QuantumResult};
pub use gate::PreparationGate;
pub use noise::{
    Absorption, DetectorEfficiency, FibreDepolarization, FibreLoss, FibreModel, PhotonGenerator,
};
pub use processor::{Processor, ProcessorProfile};
pub use register::QuantumRegister;
pub use state::DensityMatrix;
